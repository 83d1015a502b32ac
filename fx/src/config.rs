//! Lookup service configuration.

use std::time::Duration;

use ratecache_common::{parse_millis, Currency, DEFAULT_FETCH_TIMEOUT};

use crate::cache::CacheConfig;

/// Configuration for [`RateLookupService`](crate::RateLookupService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Base used when a call does not name one. `None` defers to the
    /// source's own default.
    pub default_base: Option<Currency>,
    /// Upper bound on a single upstream fetch.
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            default_base: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ttl) = std::env::var("RATECACHE_TTL_MS") {
            if let Some(ttl) = parse_millis(&ttl) {
                config.cache.ttl = ttl;
            }
        }

        if let Ok(max) = std::env::var("RATECACHE_MAX_ENTRIES") {
            if let Ok(max) = max.parse() {
                config.cache.max_entries = max;
            }
        }

        if let Ok(base) = std::env::var("RATECACHE_BASE") {
            config.default_base = Currency::parse(&base).ok();
        }

        if let Ok(timeout) = std::env::var("RATECACHE_FETCH_TIMEOUT_MS") {
            if let Some(timeout) = parse_millis(&timeout) {
                config.fetch_timeout = timeout;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.ttl.is_zero() {
            return Err("Cache TTL cannot be zero".to_string());
        }

        if self.cache.max_entries == 0 {
            return Err("Cache max entries cannot be zero".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout cannot be zero".to_string());
        }

        Ok(())
    }
}
