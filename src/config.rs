use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a TOML file that replaces the embedded defaults.
pub const CONFIG_PATH_ENV: &str = "POKEDEX_CONFIG";

const DEFAULT_CONFIG: &str = include_str!("../config/config.toml");

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u32,
    pub cache_enabled: bool,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CacheConfig {
    pub r#type: String,
    pub max_size: u32,
    /// Entry lifetime in seconds.
    pub expiration: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub list_limit: u32,
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            list_limit: 151,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout))
    }

    /// Concurrency cap for fan-outs; zero is treated as one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

impl CacheConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(u64::from(self.expiration))
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, CatalogError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `POKEDEX_CONFIG` if set, else the embedded defaults.
    pub fn load() -> Result<Self, CatalogError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read config file {}: {}", path.display(), e);
            CatalogError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&source)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.api.base_url.trim().is_empty() {
            return Err(CatalogError::Config("api.base_url must not be empty".into()));
        }
        if self.api.timeout == 0 {
            return Err(CatalogError::Config("api.timeout must be at least 1 second".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://pokeapi.co/api/v2".to_string(),
                timeout: 10,
                cache_enabled: true,
                max_concurrency: default_max_concurrency(),
            },
            cache: CacheConfig {
                r#type: "memory".to_string(),
                max_size: 1000,
                expiration: 3600,
            },
            server: ServerConfig::default(),
        }
    }
}
