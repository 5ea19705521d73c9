//! Runner configuration.
//!
//! Read from `~/.config/feedbridge/config.toml` unless a path is given.
//! If the default file doesn't exist, a commented default is written and the
//! defaults are used. Every section is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub enrichment: EnrichmentConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend name as accepted by the cache factory (`File`, `sqlite`, ...).
    pub backend: String,
    /// Directory for on-disk backends. Defaults to the user cache dir.
    pub path: Option<PathBuf>,
    pub prune_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "File".to_string(),
            path: None,
            prune_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    /// Per-request timeout, never below one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Bounds on secondary fetches within one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub workers: usize,
    pub per_host: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            per_host: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Overall deadline for one bridge run.
    pub request_timeout_secs: u64,
    /// Memoize whole run results for the bridge's cache timeout.
    pub cache_results: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            cache_results: true,
        }
    }
}

impl RunnerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path: `~/.config/feedbridge/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedbridge").join("config.toml"))
    }

    /// Directory for on-disk cache backends.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => dirs::cache_dir()
                .map(|dir| dir.join("feedbridge"))
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, DEFAULT_CONFIG).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

const DEFAULT_CONFIG: &str = r##"# feedbridge configuration

[cache]
# One of: File, Sqlite, Memory, Null (case-insensitive, "Cache" suffix allowed)
backend = "File"
# Directory for the File and Sqlite backends (default: user cache dir)
# path = "/var/cache/feedbridge"
# Remove expired entries when the runner starts
prune_on_start = false

[http]
# Per-request timeout in seconds
timeout_secs = 30
# user_agent = "feedbridge (+https://example.org)"

[enrichment]
# Secondary fetches in flight per run
workers = 4
# Concurrent requests per host
per_host = 2

[runner]
# Overall deadline for one bridge run, in seconds
request_timeout_secs = 120
# Serve repeated runs from the cache for the bridge's cache timeout
cache_results = true
"##;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
