use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{BridgeError, Result};
use crate::cache::{expiry, CacheBackend, CacheKey, Clock, SystemClock};

enum Location {
    File(PathBuf),
    InMemory,
}

/// SQLite-backed cache. The database is opened and migrated on first use.
pub struct SqliteCache {
    location: Location,
    conn: Mutex<Option<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::build(Location::File(path.into()), Arc::new(SystemClock))
    }

    pub fn in_memory() -> Self {
        Self::build(Location::InMemory, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self::build(Location::File(path.into()), clock)
    }

    fn build(location: Location, clock: Arc<dyn Clock>) -> Self {
        Self {
            location,
            conn: Mutex::new(None),
            clock,
        }
    }

    fn open(&self) -> Result<Connection> {
        let mut conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        BridgeError::CacheUnavailable(format!("{}: {}", parent.display(), e))
                    })?;
                }
                Connection::open(path)?
            }
            Location::InMemory => Connection::open_in_memory()?,
        };

        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);
        migrations
            .to_latest(&mut conn)
            .map_err(|e| BridgeError::CacheUnavailable(format!("migration failed: {}", e)))?;

        Ok(conn)
    }

    /// Run `f` against the connection, opening it first if needed.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| BridgeError::CacheUnavailable(e.to_string()))?;

        if guard.is_none() {
            *guard = Some(self.open()?);
        }

        match guard.as_ref() {
            Some(conn) => f(conn).map_err(|e| BridgeError::CacheUnavailable(e.to_string())),
            None => Err(BridgeError::CacheUnavailable("connection not open".into())),
        }
    }
}

impl CacheBackend for SqliteCache {
    fn name(&self) -> &'static str {
        "Sqlite"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now().timestamp();
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key.as_str(), now],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return self.with_conn(|conn| {
                conn.execute(
                    "DELETE FROM cache_entries WHERE key = ?1",
                    params![key.as_str()],
                )
                .map(|_| ())
            });
        }

        let expires_at = expiry(self.clock.now(), ttl).timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key.as_str(), value, expires_at],
            )
            .map(|_| ())
        })
    }

    fn prune(&self) -> Result<usize> {
        let now = self.clock.now().timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![now],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;

    #[test]
    fn test_construction_is_lazy() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("cache.db");
        let cache = SqliteCache::new(&path);
        assert!(!path.exists());

        cache
            .set(&CacheKey::for_url("a"), b"x", Duration::from_secs(5))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip_and_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let cache = SqliteCache::with_clock(tmp.path().join("cache.db"), clock.clone());
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"body", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(b"body".to_vec()));

        clock.advance(61);
        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.prune().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let cache = SqliteCache::in_memory();
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"one", Duration::from_secs(60)).unwrap();
        cache.set(&key, b"two", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_zero_ttl_deletes() {
        let cache = SqliteCache::in_memory();
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"one", Duration::from_secs(60)).unwrap();
        cache.set(&key, b"two", Duration::ZERO).unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.db");
        let key = CacheKey::for_url("https://example.com");

        SqliteCache::new(&path)
            .set(&key, b"persisted", Duration::from_secs(600))
            .unwrap();

        let reopened = SqliteCache::new(&path);
        assert_eq!(reopened.get(&key).unwrap(), Some(b"persisted".to_vec()));
    }
}
