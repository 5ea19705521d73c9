//! The fetch → parse → extract → normalize plumbing bridges compose.
//!
//! A [`Pipeline`] is created per run. It wraps the shared fetcher, cache
//! backend and per-host limiter, carries the bridge's cache TTL, and counts
//! recoverable failures in [`RunStats`].

mod stats;

pub use stats::{RunStats, StatsSnapshot};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::{BridgeError, Result};
use crate::cache::{CacheBackend, CacheKey};
use crate::fetcher::{Fetcher, HostLimiter};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheBackend>,
    hosts: Arc<HostLimiter>,
    workers: usize,
    ttl: Duration,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn CacheBackend>,
        hosts: Arc<HostLimiter>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            hosts,
            workers: DEFAULT_WORKERS,
            ttl: DEFAULT_TTL,
            stats: RunStats::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Uncached GET, subject to the per-host cap.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let _permit = self.hosts.acquire(url).await;
        self.stats.record_fetch();
        self.fetcher.fetch(url).await
    }

    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// GET through the cache, keyed by URL, stored for the run's TTL.
    /// Cache failures degrade to a plain fetch.
    pub async fn fetch_cached(&self, url: &Url) -> Result<Vec<u8>> {
        let key = CacheKey::for_url(url.as_str());

        match self.cache_get(&key).await {
            Ok(Some(body)) => {
                self.stats.record_cache_hit();
                tracing::debug!("Cache hit for {}", url);
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache lookup failed for {}: {}", url, e),
        }

        let body = self.fetch(url).await?;

        if let Err(e) = self.cache_set(&key, body.clone()).await {
            tracing::warn!("Cache store failed for {}: {}", url, e);
        }

        Ok(body)
    }

    /// Backends may touch the disk, so they run on the blocking pool.
    async fn cache_get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let cache = self.cache.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || cache.get(&key))
            .await
            .map_err(|e| BridgeError::CacheUnavailable(e.to_string()))?
    }

    async fn cache_set(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        let cache = self.cache.clone();
        let key = key.clone();
        let ttl = self.ttl;
        tokio::task::spawn_blocking(move || cache.set(&key, &value, ttl))
            .await
            .map_err(|e| BridgeError::CacheUnavailable(e.to_string()))?
    }

    pub async fn fetch_cached_text(&self, url: &Url) -> Result<String> {
        let body = self.fetch_cached(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// GET and decode a JSON document. A body that does not match `T` is a
    /// parse error for `url`.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &Url, cached: bool) -> Result<T> {
        let body = if cached {
            self.fetch_cached(url).await?
        } else {
            self.fetch(url).await?
        };
        serde_json::from_slice(&body).map_err(|e| BridgeError::parse(url.as_str(), e))
    }

    /// Run `f` over `inputs` with at most `workers` in flight, returning
    /// results in input order. Each call's outcome is independent: a failing
    /// input does not cancel the others.
    pub async fn map_ordered<T, R, F, Fut>(&self, inputs: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = R> + Send,
    {
        stream::iter(inputs)
            .map(f)
            .buffered(self.workers)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NullCache};
    use crate::fetcher::mock::MockFetcher;

    fn pipeline(fetcher: Arc<MockFetcher>, cache: Arc<dyn CacheBackend>) -> Pipeline {
        Pipeline::new(fetcher, cache, Arc::new(HostLimiter::new(2)))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_cached_hits_network_once() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://example.com/a", "body"));
        let pipeline = pipeline(fetcher.clone(), Arc::new(MemoryCache::new()));

        let first = pipeline.fetch_cached_text(&url("https://example.com/a")).await.unwrap();
        let second = pipeline.fetch_cached_text(&url("https://example.com/a")).await.unwrap();

        assert_eq!(first, "body");
        assert_eq!(second, "body");
        assert_eq!(fetcher.calls_to("https://example.com/a"), 1);
        assert_eq!(pipeline.stats().snapshot().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_bypasses_cache() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://example.com/a", "body"));
        let pipeline =
            pipeline(fetcher.clone(), Arc::new(MemoryCache::new())).with_ttl(Duration::ZERO);

        pipeline.fetch_cached(&url("https://example.com/a")).await.unwrap();
        pipeline.fetch_cached(&url("https://example.com/a")).await.unwrap();
        assert_eq!(fetcher.calls_to("https://example.com/a"), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let fetcher = Arc::new(MockFetcher::new().with_status("https://example.com/a", 500));
        let pipeline = pipeline(fetcher.clone(), Arc::new(MemoryCache::new()));

        assert!(pipeline.fetch_cached(&url("https://example.com/a")).await.is_err());
        assert!(pipeline.fetch_cached(&url("https://example.com/a")).await.is_err());
        assert_eq!(fetcher.calls_to("https://example.com/a"), 2);
    }

    #[tokio::test]
    async fn test_fetch_json_mismatch_is_parse_error() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Expected {
            id: u64,
        }

        let fetcher = Arc::new(MockFetcher::new().with_page("https://api.example/x", "[1,2]"));
        let pipeline = pipeline(fetcher, Arc::new(NullCache));

        let result = pipeline
            .fetch_json::<Expected>(&url("https://api.example/x"), false)
            .await;
        assert!(matches!(result, Err(BridgeError::Parse { .. })));
    }

    /// Records which thread each cache call ran on.
    #[derive(Default)]
    struct ThreadRecordingCache {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl CacheBackend for ThreadRecordingCache {
        fn name(&self) -> &'static str {
            "ThreadRecording"
        }

        fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(None)
        }

        fn set(&self, _key: &CacheKey, _value: &[u8], _ttl: Duration) -> Result<()> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(())
        }

        fn prune(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_cache_calls_run_off_the_runtime_thread() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://a.example/", "body"));
        let cache = Arc::new(ThreadRecordingCache::default());
        let pipeline = pipeline(fetcher, cache.clone());

        let body = pipeline.fetch_cached(&url("https://a.example/")).await.unwrap();
        assert_eq!(body, b"body".to_vec());

        let runtime_thread = std::thread::current().id();
        let threads = cache.threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }

    #[test]
    fn test_map_ordered_preserves_order_and_isolates_failures() {
        let fetcher = Arc::new(MockFetcher::new());
        let pipeline = pipeline(fetcher, Arc::new(NullCache)).with_workers(3);

        let results = tokio_test::block_on(pipeline.map_ordered(
            vec![30u64, 10, 20, 0],
            |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if delay == 0 {
                    Err("boom")
                } else {
                    Ok(delay)
                }
            },
        ));

        assert_eq!(results, vec![Ok(30), Ok(10), Ok(20), Err("boom")]);
    }
}
