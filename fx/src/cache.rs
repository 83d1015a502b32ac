//! Rate table caching with TTL support.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ratecache_common::{AsOf, Currency, RateTable, DEFAULT_TTL};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies one cached table: a base currency at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub base: Currency,
    pub as_of: AsOf,
}

impl CacheKey {
    pub fn new(base: Currency, as_of: AsOf) -> Self {
        Self { base, as_of }
    }

    /// Key for the most recent rates of `base`.
    pub fn latest(base: Currency) -> Self {
        Self::new(base, AsOf::Latest)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.base, self.as_of)
    }
}

/// Cached table entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    table: Arc<RateTable>,
    stored_at: Instant,
}

impl CacheEntry {
    fn new(table: Arc<RateTable>) -> Self {
        Self {
            table,
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Configuration for the rate table cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of every cached table.
    pub ttl: Duration,
    /// Entry count above which stale entries are evicted on insert.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: 1024,
        }
    }
}

/// Thread-safe rate table cache with a uniform TTL.
pub struct CacheStore {
    entries: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
}

impl CacheStore {
    /// Create a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache whose entries live for `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_config(CacheConfig {
            ttl,
            ..Default::default()
        })
    }

    /// Create a new cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Get a table from cache if it is still fresh.
    ///
    /// A stale entry is dropped and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RateTable>> {
        let ttl = self.config.ttl;

        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(ttl) {
                debug!(key = %key, "Cache hit");
                return Some(entry.table.clone());
            }
        } else {
            debug!(key = %key, "Cache miss");
            return None;
        }

        // Only remove the entry if nobody replaced it since we looked.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_fresh(ttl))
            .is_some()
        {
            debug!(key = %key, "Cache entry expired");
        }
        None
    }

    /// Insert or replace the table for `key`.
    pub fn store(&self, key: CacheKey, table: Arc<RateTable>) {
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_expired();
        }

        debug!(key = %key, rates = table.len(), "Cache store");
        self.entries.insert(key, CacheEntry::new(table));
    }

    /// Remove the entry for `key`. Does nothing if it is absent.
    pub fn expire(&self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            debug!(key = %key, "Cache entry expired by request");
        }
    }

    /// Check whether `key` is absent or stale.
    pub fn is_expired(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_fresh(self.config.ttl))
            .unwrap_or(true)
    }

    /// Clear all cached tables.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get the number of entries in cache, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict stale entries.
    pub fn evict_expired(&self) {
        let ttl = self.config.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let fresh = self
            .entries
            .iter()
            .filter(|e| e.is_fresh(self.config.ttl))
            .count();

        CacheStats {
            total_entries: total,
            fresh_entries: fresh,
            stale_entries: total.saturating_sub(fresh),
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}

/// Shared rate cache.
pub type SharedCacheStore = Arc<CacheStore>;
