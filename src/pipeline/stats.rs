use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one bridge run. Recoverable failures end up here instead of
/// aborting the run.
#[derive(Debug, Default)]
pub struct RunStats {
    fetches: AtomicUsize,
    cache_hits: AtomicUsize,
    skipped: AtomicUsize,
    enrichment_failures: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub fetches: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub enrichment_failures: usize,
}

impl RunStats {
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A listing entry that lacked expected structure and was dropped.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// A secondary fetch or extraction that failed; the item fell back.
    pub fn record_enrichment_failure(&self) {
        self.enrichment_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            enrichment_failures: self.enrichment_failures.load(Ordering::Relaxed),
        }
    }
}
