use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::app::{BridgeError, Result};
use crate::cache::{CacheBackend, FileCache, MemoryCache, NullCache, SqliteCache};

/// Settings the registered constructors may draw on.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Directory for on-disk backends.
    pub dir: PathBuf,
}

struct Registration {
    name: &'static str,
    construct: fn(&CacheSettings) -> Arc<dyn CacheBackend>,
}

/// Every backend this build knows about. The only way a backend comes into
/// existence is through one of these constructors.
const REGISTRATIONS: &[Registration] = &[
    Registration {
        name: "File",
        construct: file_backend,
    },
    Registration {
        name: "Memory",
        construct: memory_backend,
    },
    Registration {
        name: "Null",
        construct: null_backend,
    },
    Registration {
        name: "Sqlite",
        construct: sqlite_backend,
    },
];

fn file_backend(settings: &CacheSettings) -> Arc<dyn CacheBackend> {
    Arc::new(FileCache::new(settings.dir.join("files")))
}

fn memory_backend(_: &CacheSettings) -> Arc<dyn CacheBackend> {
    Arc::new(MemoryCache::new())
}

fn null_backend(_: &CacheSettings) -> Arc<dyn CacheBackend> {
    Arc::new(NullCache)
}

fn sqlite_backend(settings: &CacheSettings) -> Arc<dyn CacheBackend> {
    Arc::new(SqliteCache::new(settings.dir.join("cache.sqlite")))
}

/// Suffixes operators historically put on backend names ("FileCache.php").
const SOURCE_SUFFIXES: &[&str] = &[".rs", ".php"];
const TYPE_SUFFIX: &str = "cache";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("identifier pattern is valid")
});

/// Resolves untrusted backend names to backend instances.
pub struct CacheFactory {
    settings: CacheSettings,
    names: Vec<&'static str>,
}

impl CacheFactory {
    pub fn new(settings: CacheSettings) -> Self {
        let names = REGISTRATIONS.iter().map(|r| r.name).collect();
        Self { settings, names }
    }

    /// Canonical names of all known backends.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Map `requested` onto a known backend name without constructing anything.
    pub fn resolve(&self, requested: &str) -> Result<&'static str> {
        let normalized = normalize(requested);

        let canonical = self
            .names
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(normalized))
            .ok_or_else(|| BridgeError::InvalidBackend(requested.to_string()))?;

        if !IDENTIFIER.is_match(canonical) {
            return Err(BridgeError::InvalidBackend(requested.to_string()));
        }

        Ok(canonical)
    }

    pub fn create(&self, requested: &str) -> Result<Arc<dyn CacheBackend>> {
        let name = self.resolve(requested)?;
        let registration = REGISTRATIONS
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| BridgeError::InvalidBackend(requested.to_string()))?;

        tracing::debug!(backend = name, "Creating cache backend");
        Ok((registration.construct)(&self.settings))
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    (!head.is_empty() && tail.eq_ignore_ascii_case(suffix)).then_some(head)
}

fn normalize(requested: &str) -> &str {
    let mut name = requested.trim();
    if let Some(stripped) = SOURCE_SUFFIXES
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(name, suffix))
    {
        name = stripped;
    }
    strip_suffix_ignore_case(name, TYPE_SUFFIX).unwrap_or(name)
}
