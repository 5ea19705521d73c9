use std::time::Duration;

use crate::app::Result;
use crate::cache::{CacheBackend, CacheKey};

/// Cache that stores nothing. Every lookup is a miss.
#[derive(Debug, Default)]
pub struct NullCache;

impl CacheBackend for NullCache {
    fn name(&self) -> &'static str {
        "Null"
    }

    fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn set(&self, _key: &CacheKey, _value: &[u8], _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn prune(&self) -> Result<usize> {
        Ok(0)
    }
}
