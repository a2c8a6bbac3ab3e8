//! Per-screen load state.
//!
//! A [`ViewScope`] owns the cancellation token handed to every pipeline call
//! made on behalf of one view. Once the view is disposed, in-flight requests
//! are cancelled and any result that still arrives is dropped.

use crate::error::CatalogError;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    /// Terminal; holds the message shown in place of the view.
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ViewState::Loading)
    }
}

#[derive(Debug)]
pub struct ViewScope<T> {
    context: String,
    token: CancellationToken,
    state: Mutex<ViewState<T>>,
}

impl<T: Clone> ViewScope<T> {
    /// `context` names the data in error messages, e.g. "Pokémon details".
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            token: CancellationToken::new(),
            state: Mutex::new(ViewState::Loading),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn state(&self) -> ViewState<T> {
        self.lock().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels outstanding requests. Later results are ignored.
    pub fn dispose(&self) {
        tracing::debug!("Disposing view for {}", self.context);
        // Cancelling under the state lock orders it against `apply`.
        let _state = self.lock();
        self.token.cancel();
    }

    /// Records the outcome of a load. Returns `false` when the view was
    /// disposed first, leaving the state untouched.
    pub fn apply(&self, result: Result<T, CatalogError>) -> bool {
        let mut state = self.lock();
        if self.token.is_cancelled() {
            if let Err(e) = &result {
                tracing::debug!("Discarding late error for {}: {}", self.context, e);
            }
            return false;
        }

        *state = match result {
            Ok(value) => ViewState::Ready(value),
            Err(e) => {
                tracing::error!("Error loading {}: {}", self.context, e);
                ViewState::Failed(e.user_message(&self.context))
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Catalog;
    use crate::testing::{FakeFetcher, pokemon_json};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_id_is_terminal_error() {
        let catalog = Catalog::new(Arc::new(FakeFetcher::new()), 4);
        let view = ViewScope::new("Pokémon details");
        assert_eq!(view.state(), ViewState::Loading);

        let result = catalog.pokemon_detail(None, view.token()).await;
        assert!(view.apply(result));

        let state = view.state();
        assert!(state.is_terminal());
        assert_eq!(state, ViewState::Failed("Error: Invalid Pokémon ID.".to_string()));
        assert_eq!(catalog.fetcher().request_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_message() {
        let view: ViewScope<u32> = ViewScope::new("moves");
        view.apply(Err(CatalogError::Http {
            status: 503,
            reason: Some("Service Unavailable".into()),
        }));
        assert_eq!(
            view.state(),
            ViewState::Failed("Error loading moves: Service Unavailable".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_view_ignores_late_result() {
        let fetcher = FakeFetcher::new().with_delay(
            "pokemon/25",
            pokemon_json(25, "pikachu", &["electric"]),
            Duration::from_secs(2),
        );
        let catalog = Catalog::new(Arc::new(fetcher), 4);
        let view = Arc::new(ViewScope::new("Pokémon"));

        let load = {
            let view = Arc::clone(&view);
            let catalog = catalog.clone();
            tokio::spawn(async move {
                let result = catalog.pokemon(25, view.token()).await;
                view.apply(result)
            })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        view.dispose();

        assert!(!load.await.unwrap());
        assert_eq!(view.state(), ViewState::Loading);
        assert!(view.is_disposed());
    }

    #[test]
    fn test_result_after_dispose_is_dropped() {
        let view = ViewScope::new("items");
        view.dispose();
        assert!(!view.apply(Ok(vec!["potion".to_string()])));
        assert_eq!(view.state(), ViewState::Loading);
    }

    #[test]
    fn test_no_result_lands_after_dispose_returns() {
        let view = Arc::new(ViewScope::new("items"));
        let writer = {
            let view = Arc::clone(&view);
            std::thread::spawn(move || {
                let mut n = 0u64;
                while view.apply(Ok(n)) {
                    n += 1;
                }
            })
        };

        std::thread::sleep(Duration::from_millis(5));
        view.dispose();
        let at_dispose = view.state();
        writer.join().unwrap();

        assert_eq!(view.state(), at_dispose);
        assert!(!view.apply(Ok(u64::MAX)));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_value(ViewState::Ready(3)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "ready", "data": 3}));
    }
}
