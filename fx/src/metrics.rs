//! Lookup counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::CacheStats;

/// Counters maintained by the lookup service.
#[derive(Debug, Default)]
pub struct LookupMetrics {
    /// Lookups answered from a fresh cache entry.
    pub cache_hits: AtomicU64,
    /// Lookups that had to go through a refresh.
    pub cache_misses: AtomicU64,
    /// Upstream fetches issued.
    pub fetches: AtomicU64,
    /// Upstream fetches that failed or timed out.
    pub fetch_failures: AtomicU64,
}

impl LookupMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_started(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self, cache: CacheStats, in_flight: usize) -> ServiceStats {
        ServiceStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            in_flight,
            cache,
        }
    }
}

/// Lookup service statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub in_flight: usize,
    pub cache: CacheStats,
}

impl ServiceStats {
    /// Fraction of lookups served from cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_hit_rate() {
        let metrics = LookupMetrics::new();
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_miss();
        metrics.fetch_started();

        let stats = metrics.snapshot(CacheStats::default(), 0);

        assert_eq!(stats.cache_hits, 3);
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.fetch_failures, 0);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_without_lookups() {
        assert_eq!(ServiceStats::default().hit_rate(), 0.0);
    }
}
