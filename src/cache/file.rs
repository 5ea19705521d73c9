use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app::{BridgeError, Result};
use crate::cache::{expiry, CacheBackend, CacheKey, Clock, SystemClock};

const EXTENSION: &str = "cache";

/// One file per key under a cache directory.
///
/// File layout: the expiry as unix seconds on the first line, then the raw
/// value. Writes go to a temporary file that is renamed over the old entry,
/// so readers see either the old or the new entry, never a mix.
pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    tmp_counter: AtomicU64,
}

impl FileCache {
    /// The directory is created on first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, EXTENSION))
    }

    fn read_entry(path: &Path) -> io::Result<Option<(i64, Vec<u8>)>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(newline) = bytes.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        let expires_at = std::str::from_utf8(&bytes[..newline])
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok());

        Ok(expires_at.map(|expires_at| (expires_at, bytes[newline + 1..].to_vec())))
    }
}

fn unavailable(path: &Path, e: io::Error) -> BridgeError {
    BridgeError::CacheUnavailable(format!("{}: {}", path.display(), e))
}

impl CacheBackend for FileCache {
    fn name(&self) -> &'static str {
        "File"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        let entry = Self::read_entry(&path).map_err(|e| unavailable(&path, e))?;
        let now = self.clock.now().timestamp();
        Ok(entry
            .filter(|(expires_at, _)| *expires_at > now)
            .map(|(_, value)| value))
    }

    fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()> {
        let path = self.entry_path(key);

        if ttl.is_zero() {
            return match fs::remove_file(&path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(unavailable(&path, e)),
                _ => Ok(()),
            };
        }

        fs::create_dir_all(&self.dir).map_err(|e| unavailable(&self.dir, e))?;

        let expires_at = expiry(self.clock.now(), ttl).timestamp();
        let tmp = self.dir.join(format!(
            "{}.{}.{}.tmp",
            key,
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            writeln!(file, "{}", expires_at)?;
            file.write_all(value)?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            unavailable(&path, e)
        })
    }

    fn prune(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(unavailable(&self.dir, e)),
        };

        let now = self.clock.now().timestamp();
        let mut removed = 0;

        for entry in entries {
            let path = entry.map_err(|e| unavailable(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }

            let expired = match Self::read_entry(&path) {
                Ok(Some((expires_at, _))) => expires_at <= now,
                // Unreadable header: the entry can never be served again.
                Ok(None) => true,
                Err(e) => {
                    tracing::warn!("Skipping cache file {}: {}", path.display(), e);
                    false
                }
            };

            if expired && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;

    #[test]
    fn test_construction_does_not_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("not-yet");
        let cache = FileCache::new(&dir);
        assert!(!dir.exists());

        let key = CacheKey::for_url("https://example.com");
        assert!(cache.get(&key).unwrap().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_round_trip_and_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let cache = FileCache::with_clock(tmp.path().join("c"), clock.clone());
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"line one\nline two", Duration::from_secs(30)).unwrap();
        assert_eq!(
            cache.get(&key).unwrap(),
            Some(b"line one\nline two".to_vec())
        );

        clock.advance(30);
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FileCache::new(tmp.path());
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"one", Duration::from_secs(30)).unwrap();
        cache.set(&key, b"two", Duration::from_secs(30)).unwrap();

        assert_eq!(cache.get(&key).unwrap(), Some(b"two".to_vec()));
        let files: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_zero_ttl_removes_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FileCache::new(tmp.path());
        let key = CacheKey::for_url("https://example.com");

        cache.set(&key, b"one", Duration::from_secs(30)).unwrap();
        cache.set(&key, b"two", Duration::ZERO).unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_prune_removes_expired_and_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let cache = FileCache::with_clock(tmp.path(), clock.clone());

        cache
            .set(&CacheKey::for_url("short"), b"s", Duration::from_secs(10))
            .unwrap();
        cache
            .set(&CacheKey::for_url("long"), b"l", Duration::from_secs(1000))
            .unwrap();
        fs::write(tmp.path().join("garbage.cache"), b"no header").unwrap();
        fs::write(tmp.path().join("unrelated.txt"), b"keep").unwrap();

        clock.advance(20);
        assert_eq!(cache.prune().unwrap(), 2);
        assert!(tmp.path().join("unrelated.txt").exists());
        assert!(cache.get(&CacheKey::for_url("long")).unwrap().is_some());
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FileCache::new(tmp.path().join("missing"));
        assert_eq!(cache.prune().unwrap(), 0);
    }
}
