use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error in {bridge}: {message}")]
    Config { bridge: String, message: String },

    #[error("Invalid cache backend: {0}")]
    InvalidBackend(String),

    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Parse error in {target}: {reason}")]
    Parse { target: String, reason: String },

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("{bridge} [{context}] failed: {source}")]
    Invocation {
        bridge: String,
        context: String,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("{bridge} did not finish within {after:?}")]
    Timeout { bridge: String, after: Duration },

    #[error(transparent)]
    Settings(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn config(bridge: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            bridge: bridge.into(),
            message: message.into(),
        }
    }

    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// The underlying error, looking through the invocation wrapper.
    pub fn root_cause(&self) -> &BridgeError {
        match self {
            Self::Invocation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
