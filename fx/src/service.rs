//! Cache-aside rate lookup service.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use ratecache_common::{AsOf, Currency, RateTable};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CacheStore, SharedCacheStore};
use crate::config::ServiceConfig;
use crate::error::{FxError, FxResult, SourceError};
use crate::metrics::{LookupMetrics, ServiceStats};
use crate::single_flight::SingleFlight;
use crate::source::RateSource;

/// Answers table and single-rate queries from cache, refreshing each
/// (base, as-of) key at most once at a time.
pub struct RateLookupService {
    source: Arc<dyn RateSource>,
    cache: SharedCacheStore,
    flights: SingleFlight<Arc<RateTable>>,
    current_base: RwLock<Option<Currency>>,
    metrics: LookupMetrics,
    config: ServiceConfig,
}

impl RateLookupService {
    /// Create a new service with its own cache.
    pub fn new(source: Arc<dyn RateSource>, config: ServiceConfig) -> Self {
        let cache = Arc::new(CacheStore::with_config(config.cache.clone()));
        Self::with_cache(source, cache, config)
    }

    /// Create a service over an existing cache.
    pub fn with_cache(
        source: Arc<dyn RateSource>,
        cache: SharedCacheStore,
        config: ServiceConfig,
    ) -> Self {
        Self {
            source,
            cache,
            flights: SingleFlight::new(),
            current_base: RwLock::new(config.default_base.clone()),
            metrics: LookupMetrics::new(),
            config,
        }
    }

    /// Get the full rate table for `base` at `as_of`.
    ///
    /// A blank `base` means the current base currency.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn list(&self, base: &str, as_of: AsOf) -> FxResult<Arc<RateTable>> {
        let (base, implicit) = self.resolve_base(base)?;
        let key = CacheKey::new(base, as_of);

        if let Some(table) = self.cache.get(&key) {
            self.metrics.cache_hit();
            return Ok(table);
        }
        self.metrics.cache_miss();

        let table = self.flights.run_once(&key, || self.refresh(&key)).await?;

        if implicit && table.base != key.base {
            info!(
                previous = %key.base,
                current = %table.base,
                "Adopting base currency reported by source"
            );
            *self.current_base.write() = Some(table.base.clone());
        }

        Ok(table)
    }

    /// Get the rate of `code` against `base` at `as_of`.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn get_rate(&self, base: &str, as_of: AsOf, code: &str) -> FxResult<f64> {
        let code = code.trim();
        if code.is_empty() {
            return Err(FxError::InvalidCode("currency code must be given".to_string()));
        }

        let table = self.list(base, as_of).await?;
        table.rate(code).ok_or_else(|| FxError::RateNotFound {
            base: table.base.clone(),
            code: code.to_uppercase(),
        })
    }

    /// Latest table for the current base.
    pub async fn latest(&self) -> FxResult<Arc<RateTable>> {
        self.list("", AsOf::Latest).await
    }

    /// Historical table for the current base.
    pub async fn historical(&self, date: NaiveDate) -> FxResult<Arc<RateTable>> {
        self.list("", AsOf::Date(date)).await
    }

    /// Latest rate of `code` against the current base.
    pub async fn latest_rate(&self, code: &str) -> FxResult<f64> {
        self.get_rate("", AsOf::Latest, code).await
    }

    /// Historical rate of `code` against the current base.
    pub async fn historical_rate(&self, date: NaiveDate, code: &str) -> FxResult<f64> {
        self.get_rate("", AsOf::Date(date), code).await
    }

    /// Get the current base currency, if one is known.
    pub fn base_currency(&self) -> Option<Currency> {
        self.current_base.read().clone()
    }

    /// Change the base used by calls that do not name one.
    ///
    /// Tables cached for other bases stay cached.
    pub fn set_base_currency(&self, base: Option<Currency>) {
        debug!(base = ?base, "Base currency changed");
        *self.current_base.write() = base;
    }

    /// Drop the cached table for `base` at `as_of`.
    pub fn expire(&self, base: &str, as_of: AsOf) -> FxResult<()> {
        let (base, _) = self.resolve_base(base)?;
        self.cache.expire(&CacheKey::new(base, as_of));
        Ok(())
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &SharedCacheStore {
        &self.cache
    }

    /// Get the rate source name.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Get service statistics.
    pub fn stats(&self) -> ServiceStats {
        self.metrics
            .snapshot(self.cache.stats(), self.flights.in_flight())
    }

    /// Resolve the base for a call, reporting whether it was implied.
    fn resolve_base(&self, base: &str) -> FxResult<(Currency, bool)> {
        if !base.trim().is_empty() {
            return Currency::parse(base)
                .map(|currency| (currency, false))
                .map_err(|_| FxError::InvalidBase(base.to_string()));
        }

        if let Some(current) = self.base_currency() {
            return Ok((current, true));
        }

        self.source
            .default_base()
            .map(|currency| (currency, true))
            .ok_or_else(|| {
                FxError::InvalidBase("no base given and no default configured".to_string())
            })
    }

    /// Fetch and store the table for `key`. Runs as a single-flight leader.
    async fn refresh(&self, key: &CacheKey) -> FxResult<Arc<RateTable>> {
        // A flight that landed between our miss and becoming leader has
        // already stored a fresh table.
        if let Some(table) = self.cache.get(key) {
            return Ok(table);
        }

        self.metrics.fetch_started();
        let timeout = self.config.fetch_timeout;
        let fetched = tokio::time::timeout(timeout, self.source.fetch(&key.base, key.as_of))
            .await
            .unwrap_or(Err(SourceError::Timeout(timeout)));

        let table = match fetched {
            Ok(table) => Arc::new(table),
            Err(e) => {
                self.metrics.fetch_failed();
                warn!(key = %key, error = %e, "Rate fetch failed");
                return Err(e.into());
            }
        };

        if table.base != key.base {
            warn!(
                requested = %key.base,
                returned = %table.base,
                "Source answered with a different base currency"
            );
        }

        self.cache
            .store(CacheKey::new(table.base.clone(), key.as_of), table.clone());

        info!(key = %key, rates = table.len(), "Fetched rate table");
        Ok(table)
    }
}
