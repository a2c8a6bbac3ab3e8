use crate::cache::CacheError;

/// Broad classification used when deciding how a failure surfaces to a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    InvalidInput,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request failed with status {status}")]
    Http { status: u16, reason: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("mismatched API URLs (expected {expected_base} but got {actual_url} instead)")]
    BaseUrlMismatch {
        expected_base: String,
        actual_url: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Http { .. }
            | CatalogError::Network(_)
            | CatalogError::Timeout
            | CatalogError::Cancelled
            | CatalogError::Cache(_) => ErrorKind::Network,
            CatalogError::Parse(_) => ErrorKind::Parse,
            CatalogError::InvalidInput(_)
            | CatalogError::BaseUrlMismatch { .. }
            | CatalogError::Config(_) => ErrorKind::InvalidInput,
        }
    }

    /// Renders the message a screen shows in its error state.
    ///
    /// HTTP failures prefer the status text, falling back to the error's own
    /// message. Invalid input is shown verbatim since it already reads as a
    /// complete sentence.
    pub fn user_message(&self, context: &str) -> String {
        match self {
            CatalogError::InvalidInput(msg) => msg.clone(),
            CatalogError::Http {
                reason: Some(reason),
                ..
            } => format!("Error loading {}: {}", context, reason),
            CatalogError::Parse(_) => format!(
                "An error occurred while loading {}: unexpected response.",
                context
            ),
            other => format!("Error loading {}: {}", context, other),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if let Some(status) = err.status() {
            CatalogError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
            }
        } else if err.is_decode() {
            CatalogError::Parse(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Config(err.to_string())
    }
}
