//! Pluggable TTL caches.
//!
//! Every backend implements [`CacheBackend`]. Backends are only ever created
//! through [`CacheFactory`], which maps an operator-supplied name onto a
//! fixed registration table.
//!
//! ```text
//! config "cache.backend" → CacheFactory::create → Arc<dyn CacheBackend>
//! ```

mod factory;
mod file;
mod key;
mod memory;
mod null;
mod sqlite;

pub use factory::{CacheFactory, CacheSettings};
pub use file::FileCache;
pub use key::CacheKey;
pub use memory::MemoryCache;
pub use null::NullCache;
pub use sqlite::SqliteCache;

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::Result;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Key/value store with per-entry time-to-live.
///
/// Implementations must tolerate concurrent `get`/`set` from several runs;
/// last writer wins per key. Errors are reported as
/// [`BridgeError::CacheUnavailable`](crate::app::BridgeError::CacheUnavailable)
/// and callers treat them as a miss.
pub trait CacheBackend: Send + Sync {
    /// Canonical backend name, as registered in the factory.
    fn name(&self) -> &'static str;

    /// Look up a live entry. Expired entries are never returned.
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Store `value`, replacing any previous entry. A zero `ttl` stores nothing.
    fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()>;

    /// Physically remove expired entries, returning how many were dropped.
    fn prune(&self) -> Result<usize>;
}

pub(crate) fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};

    use super::Clock;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            }
        }

        pub fn advance(&self, secs: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
