//! Remote catalog client.
//!
//! Every request goes through [`Fetcher`], which maps a resource path such as
//! `pokemon/25` or `move?limit=50` to the decoded JSON body. [`CatalogClient`]
//! is the HTTP implementation; the aggregation pipeline only sees the trait.

use crate::cache::{CacheStats, CacheTrait, InmemoryCache};
use crate::config::{ApiConfig, Config};
use crate::error::CatalogError;
use crate::pokemon::{NamedAPIResource, NamedAPIResourceList};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resource families exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Pokemon,
    PokemonSpecies,
    Move,
    Ability,
    Item,
    Nature,
    Type,
    LocationArea,
    EvolutionChain,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Pokemon => "pokemon",
            Resource::PokemonSpecies => "pokemon-species",
            Resource::Move => "move",
            Resource::Ability => "ability",
            Resource::Item => "item",
            Resource::Nature => "nature",
            Resource::Type => "type",
            Resource::LocationArea => "location-area",
            Resource::EvolutionChain => "evolution-chain",
        }
    }

    pub fn list_path(self, limit: u32) -> String {
        format!("{}?limit={}", self.path(), limit)
    }

    pub fn detail_path(self, key: impl fmt::Display) -> String {
        format!("{}/{}", self.path(), key)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// The URL prefix that absolute links from the API must start with.
    fn base_url(&self) -> &str;

    /// Fetches the JSON body at `path`, relative to [`Fetcher::base_url`].
    async fn get(&self, path: &str, cancel: &CancellationToken) -> Result<Value, CatalogError>;
}

/// Turns an API link (absolute or relative) into a path under `base_url`.
pub fn relative_path(base_url: &str, url: &str) -> Result<String, CatalogError> {
    let base = base_url.trim_end_matches('/');
    let rest = if url.starts_with("http://") || url.starts_with("https://") {
        url.strip_prefix(base)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| CatalogError::BaseUrlMismatch {
                expected_base: base.to_string(),
                actual_url: url.to_string(),
            })?
    } else {
        url
    };

    let path = rest.trim_matches('/');
    if path.is_empty() {
        return Err(CatalogError::InvalidInput(format!(
            "link {:?} does not name a resource",
            url
        )));
    }
    Ok(path.to_string())
}

/// Extracts the trailing numeric id of an API link such as `.../pokemon-species/133/`.
pub fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u32>().ok())
        .filter(|id| *id > 0)
}

pub async fn fetch_json<T, F>(
    fetcher: &F,
    path: &str,
    cancel: &CancellationToken,
) -> Result<T, CatalogError>
where
    T: DeserializeOwned,
    F: Fetcher + ?Sized,
{
    let value = fetcher.get(path, cancel).await?;
    serde_json::from_value(value).map_err(|e| {
        tracing::error!("Unexpected response shape from {}: {}", path, e);
        CatalogError::Parse(format!("{}: {}", path, e))
    })
}

/// Follows a link returned by the API.
pub async fn fetch_url<T, F>(
    fetcher: &F,
    url: &str,
    cancel: &CancellationToken,
) -> Result<T, CatalogError>
where
    T: DeserializeOwned,
    F: Fetcher + ?Sized,
{
    let path = relative_path(fetcher.base_url(), url)?;
    fetch_json(fetcher, &path, cancel).await
}

/// `GET /<resource>?limit=N`, returning the `{name, url}` references.
pub async fn list<F>(
    fetcher: &F,
    resource: Resource,
    limit: u32,
    cancel: &CancellationToken,
) -> Result<Vec<NamedAPIResource>, CatalogError>
where
    F: Fetcher + ?Sized,
{
    let page: NamedAPIResourceList = fetch_json(fetcher, &resource.list_path(limit), cancel).await?;
    tracing::debug!("Listed {} {} references", page.results.len(), resource);
    Ok(page.results)
}

/// `GET /<resource>/<id-or-name>`.
pub async fn detail<T, F>(
    fetcher: &F,
    resource: Resource,
    key: impl fmt::Display,
    cancel: &CancellationToken,
) -> Result<T, CatalogError>
where
    T: DeserializeOwned,
    F: Fetcher + ?Sized,
{
    fetch_json(fetcher, &resource.detail_path(key), cancel).await
}

/// HTTP implementation of [`Fetcher`] with an optional shared response cache.
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
    cache: Option<Arc<dyn CacheTrait<Value>>>,
}

impl CatalogClient {
    /// Builds a client and, when enabled, an in-memory cache from `config`.
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        let cache: Option<Arc<dyn CacheTrait<Value>>> = if config.api.cache_enabled {
            let cache = InmemoryCache::new(config.cache.clone());
            cache.is_enabled().then(|| Arc::new(cache) as Arc<dyn CacheTrait<Value>>)
        } else {
            None
        };
        Self::with_cache(&config.api, cache)
    }

    pub fn with_cache(
        api: &ApiConfig,
        cache: Option<Arc<dyn CacheTrait<Value>>>,
    ) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(api.timeout())
            .build()
            .map_err(|e| CatalogError::Config(format!("cannot build HTTP client: {}", e)))?;

        tracing::info!(
            "Catalog client for {} (timeout {}s, cache {})",
            api.base_url,
            api.timeout,
            if cache.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            http,
            cache,
        })
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheTrait<Value>>> {
        self.cache.as_ref()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    async fn request(&self, path: &str) -> Result<Value, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("Fetching {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            tracing::error!("Failed to make HTTP request to {}: {}", url, e);
            CatalogError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Request to {} failed with status: {}", url, status);
            return Err(CatalogError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!("Failed to parse JSON response from {}: {}", url, e);
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Parse(format!("JSON parsing failed: {}", e))
            }
        })
    }
}

#[async_trait]
impl Fetcher for CatalogClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, cancel: &CancellationToken) -> Result<Value, CatalogError> {
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }

        if let Some(value) = self.cache.as_ref().and_then(|cache| cache.get(path)) {
            return Ok(value);
        }

        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Request for {} cancelled", path);
                return Err(CatalogError::Cancelled);
            }
            result = self.request(path) => result?,
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.insert(path.to_string(), value.clone()) {
                tracing::warn!("Failed to cache response for {}: {}", path, e);
            }
        }
        Ok(value)
    }
}
