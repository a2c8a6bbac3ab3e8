use crate::config::CacheConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock error: {0}")]
    LockError(String),
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    last_accessed: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }

    fn touch(&mut self) -> T {
        self.last_accessed = Instant::now();
        self.value.clone()
    }
}

/// A response cache keyed by resource path.
pub trait CacheTrait<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T>;
    fn insert(&self, key: String, value: T) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Option<T>;
    fn clear(&self);
    fn size(&self) -> usize;
    fn stats(&self) -> CacheStats;
    fn cleanup_expired(&self) -> usize;
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    stats: CacheStats,
}

/// Time-bounded LRU cache held in memory.
///
/// Entries expire `expiration` seconds after insertion regardless of use.
/// When `max_size` is reached the least recently read entry is evicted.
pub struct InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    inner: Mutex<Inner<T>>,
    config: CacheConfig,
}

impl<T> InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(config: CacheConfig) -> Self {
        tracing::info!(
            "Initializing response cache with max_size: {}, expiration: {}s",
            config.max_size,
            config.expiration
        );

        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig {
            r#type: "memory".to_string(),
            max_size: 1000,
            expiration: 3600,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.r#type == "memory" && self.config.max_size > 0
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.entries.contains_key(key))
            .unwrap_or(false)
    }

    fn evict_lru(inner: &mut Inner<T>) {
        let lru_key = inner
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            inner.entries.remove(&key);
            inner.stats.evictions += 1;
            tracing::debug!("Evicted LRU cache entry: {}", key);
        }
    }
}

impl<T> Default for InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<T> CacheTrait<T> for InmemoryCache<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T> {
        if key.is_empty() {
            tracing::warn!("Attempted to get cache entry with empty key");
            return None;
        }

        let ttl = self.config.expiration();
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("Failed to acquire cache lock for key {}: {}", key, e);
                return None;
            }
        };
        let inner = &mut *guard;

        let expired = match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(ttl) => {
                let value = entry.touch();
                inner.stats.hits += 1;
                tracing::debug!("Cache hit for key: {}", key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            tracing::debug!("Cache entry expired for key: {}", key);
        } else {
            tracing::debug!("Cache miss for key: {}", key);
        }
        inner.stats.misses += 1;
        None
    }

    fn insert(&self, key: String, value: T) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
        }

        let mut guard = self.inner.lock().map_err(|e| {
            let msg = format!("failed to acquire cache lock: {}", e);
            tracing::error!("{}", msg);
            CacheError::LockError(msg)
        })?;
        let inner = &mut *guard;

        if !inner.entries.contains_key(&key)
            && inner.entries.len() >= self.config.max_size as usize
        {
            Self::evict_lru(inner);
        }

        if inner.entries.insert(key.clone(), CacheEntry::new(value)).is_some() {
            tracing::debug!("Replaced cached response: {}", key);
        } else {
            tracing::debug!("Cached response: {}", key);
        }
        inner.stats.inserts += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock().ok()?;
        let removed = inner.entries.remove(key).map(|entry| entry.value);
        if removed.is_some() {
            tracing::debug!("Removed cache entry: {}", key);
        }
        removed
    }

    fn clear(&self) {
        match self.inner.lock() {
            Ok(mut inner) => {
                let size = inner.entries.len();
                inner.entries.clear();
                inner.stats = CacheStats::default();
                tracing::info!("Cleared cache ({} entries)", size);
            }
            Err(e) => tracing::error!("Failed to acquire cache lock for clearing: {}", e),
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default()
    }

    fn cleanup_expired(&self) -> usize {
        let ttl = self.config.expiration();
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("Failed to acquire lock for cache cleanup");
            return 0;
        };

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(ttl));
        let expired = before - inner.entries.len();
        if expired > 0 {
            inner.stats.expirations += expired as u64;
            tracing::debug!("Cleaned up {} expired cache entries", expired);
        }
        expired
    }
}

/// Periodically drops expired entries until the task is aborted.
pub async fn run_cleanup_task<T>(cache: Arc<dyn CacheTrait<T>>, every: Duration)
where
    T: Clone + Send + Sync,
{
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        tracing::debug!("Starting periodic cache cleanup");
        cache.cleanup_expired();
    }
}
