//! In-memory [`Fetcher`] for unit tests.

use crate::client::Fetcher;
use crate::error::CatalogError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const BASE_URL: &str = "https://pokeapi.co/api/v2";

#[derive(Clone)]
struct Route {
    body: Option<Value>,
    delay: Duration,
}

/// Serves canned bodies by path, with optional latency and failures.
///
/// Unknown paths answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, body: Value) -> Self {
        self.with_delay(path, body, Duration::ZERO)
    }

    pub fn with_delay(mut self, path: &str, body: Value, delay: Duration) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                body: Some(body),
                delay,
            },
        );
        self
    }

    /// Answers `path` with a 500 after `delay`.
    pub fn failing(mut self, path: &str, delay: Duration) -> Self {
        self.routes.insert(path.to_string(), Route { body: None, delay });
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get(&self, path: &str, cancel: &CancellationToken) -> Result<Value, CatalogError> {
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(path.to_string());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let route = self.routes.get(path).cloned();
        let delay = route.as_ref().map(|r| r.delay).unwrap_or_default();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(CatalogError::Cancelled),
            _ = tokio::time::sleep(delay) => match route {
                Some(Route { body: Some(body), .. }) => Ok(body),
                Some(Route { body: None, .. }) => Err(CatalogError::Http {
                    status: 500,
                    reason: Some("Internal Server Error".into()),
                }),
                None => Err(CatalogError::Http {
                    status: 404,
                    reason: Some("Not Found".into()),
                }),
            },
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

pub fn link(resource: &str, id: u32) -> String {
    format!("{}/{}/{}/", BASE_URL, resource, id)
}

/// A minimal `pokemon/{id}` body.
pub fn pokemon_json(id: u32, name: &str, types: &[&str]) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"slot": i + 1, "type": {"name": t, "url": link("type", 1)}}))
        .collect();
    json!({
        "id": id,
        "name": name,
        "height": 7,
        "weight": 69,
        "sprites": {
            "front_default": format!("https://img/{}.png", id),
            "other": {"official-artwork": {"front_default": format!("https://art/{}.png", id)}}
        },
        "types": types,
        "abilities": [{"is_hidden": false, "slot": 1, "ability": {"name": "overgrow", "url": link("ability", 65)}}],
        "stats": [
            {"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": link("stat", 1)}},
            {"base_stat": 65, "effort": 1, "stat": {"name": "special-attack", "url": link("stat", 4)}}
        ],
        "moves": [{"move": {"name": "razor-wind", "url": link("move", 13)}}]
    })
}

pub fn list_json(resource: &str, entries: &[(u32, &str)]) -> Value {
    let results: Vec<Value> = entries
        .iter()
        .map(|(id, name)| json!({"name": name, "url": link(resource, *id)}))
        .collect();
    json!({"count": results.len(), "results": results})
}
