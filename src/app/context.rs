use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app::error::{BridgeError, Result};
use crate::bridge::{BridgeRegistry, Collected, Parameters};
use crate::cache::{CacheBackend, CacheFactory, CacheKey, CacheSettings};
use crate::config::Config;
use crate::fetcher::{Fetcher, HostLimiter, HttpFetcher};
use crate::pipeline::Pipeline;

/// Wires the registry, cache backend and fetcher together and runs bridges.
pub struct AppContext {
    pub config: Config,
    pub registry: BridgeRegistry,
    pub cache: Arc<dyn CacheBackend>,
    pub fetcher: Arc<dyn Fetcher>,
    hosts: Arc<HostLimiter>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let factory = CacheFactory::new(CacheSettings {
            dir: config.cache_dir()?,
        });
        let cache = factory.create(&config.cache.backend)?;
        tracing::debug!("Using {} cache backend", cache.name());

        if config.cache.prune_on_start {
            match cache.prune() {
                Ok(removed) => tracing::info!("Pruned {} expired cache entries", removed),
                Err(e) => tracing::warn!("Cache prune failed: {}", e),
            }
        }

        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
            config.http.timeout(),
            config.http.user_agent.as_deref(),
        ));

        Ok(Self::with_parts(
            config,
            BridgeRegistry::builtin(),
            cache,
            fetcher,
        ))
    }

    pub fn with_parts(
        config: Config,
        registry: BridgeRegistry,
        cache: Arc<dyn CacheBackend>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let hosts = Arc::new(HostLimiter::new(config.enrichment.per_host));
        Self {
            config,
            registry,
            cache,
            fetcher,
            hosts,
        }
    }

    /// Run one bridge invocation.
    ///
    /// Parameters are validated before anything is fetched. A memoized
    /// result for the same bridge and parameters is served from the cache.
    pub async fn run(&self, bridge_name: &str, parameters: &Parameters) -> Result<Collected> {
        let bridge = self.registry.get(bridge_name)?;
        let invocation = bridge.prepare(parameters)?;

        let descriptor = invocation.descriptor();
        let context = invocation.context().name;
        let request_key = CacheKey::for_request(
            &format!("{}/{}", descriptor.id, context),
            &invocation.context().values,
        );

        if self.config.runner.cache_results {
            if let Some(collected) = self.cached_result(&request_key) {
                tracing::info!("Serving {} [{}] from cache", descriptor.id, context);
                return Ok(collected);
            }
        }

        let pipeline = Pipeline::new(self.fetcher.clone(), self.cache.clone(), self.hosts.clone())
            .with_workers(self.config.enrichment.workers)
            .with_ttl(descriptor.cache_timeout);

        let identity = invocation.identity();
        tracing::debug!("Running {} [{}] for {}", descriptor.id, context, identity.uri);

        let deadline = self.config.runner.request_timeout();
        let started = Instant::now();

        let collected = match tokio::time::timeout(deadline, invocation.collect(&pipeline)).await {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                tracing::error!("{} [{}] failed: {}", descriptor.id, context, e);
                return Err(BridgeError::Invocation {
                    bridge: descriptor.id.to_string(),
                    context: context.to_string(),
                    source: Box::new(e),
                });
            }
            Err(_) => {
                tracing::error!("{} [{}] timed out after {:?}", descriptor.id, context, deadline);
                return Err(BridgeError::Timeout {
                    bridge: descriptor.id.to_string(),
                    after: deadline,
                });
            }
        };

        let stats = pipeline.stats().snapshot();
        tracing::info!(
            bridge = descriptor.id,
            context,
            items = collected.items.len(),
            fetches = stats.fetches,
            cache_hits = stats.cache_hits,
            skipped = stats.skipped,
            enrichment_failures = stats.enrichment_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bridge run finished"
        );

        if self.config.runner.cache_results {
            self.store_result(&request_key, &collected, descriptor.cache_timeout);
        }

        Ok(collected)
    }

    /// Remove expired entries from the configured backend.
    pub fn prune(&self) -> Result<usize> {
        self.cache.prune()
    }

    fn cached_result(&self, key: &CacheKey) -> Option<Collected> {
        let bytes = match self.cache.get(key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!("Result cache lookup failed: {}", e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(collected) => Some(collected),
            Err(e) => {
                tracing::warn!("Discarding undecodable cached result {}: {}", key, e);
                None
            }
        }
    }

    fn store_result(&self, key: &CacheKey, collected: &Collected, ttl: Duration) {
        let stored = serde_json::to_vec(collected)
            .map_err(BridgeError::from)
            .and_then(|bytes| self.cache.set(key, &bytes, ttl));
        if let Err(e) = stored {
            tracing::warn!("Could not cache result: {}", e);
        }
    }
}
