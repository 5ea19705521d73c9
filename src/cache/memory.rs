use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{BridgeError, Result};
use crate::cache::{expiry, CacheBackend, CacheKey, Clock, SystemClock};

struct Entry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Process-local cache. Contents are lost on exit.
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CacheKey, Entry>>> {
        self.entries
            .lock()
            .map_err(|e| BridgeError::CacheUnavailable(e.to_string()))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "Memory"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now();
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.lock()?;
        if ttl.is_zero() {
            entries.remove(key);
            return Ok(());
        }
        entries.insert(
            key.clone(),
            Entry {
                value: value.to_vec(),
                expires_at: expiry(self.clock.now(), ttl),
            },
        );
        Ok(())
    }

    fn prune(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
