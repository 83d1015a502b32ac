//! Rate source trait and test double.

use async_trait::async_trait;
use ratecache_common::{AsOf, Currency, RateTable};

use crate::error::SourceError;

/// An upstream provider of exchange-rate tables.
///
/// Implementations perform exactly one fetch per call and keep no cache of
/// their own.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Base the provider quotes against when none is requested.
    fn default_base(&self) -> Option<Currency> {
        None
    }

    /// Fetch the rate table for `base` at `as_of`.
    ///
    /// The returned table's `base` is the currency the provider actually
    /// used, which is authoritative for caching.
    async fn fetch(&self, base: &Currency, as_of: AsOf) -> Result<RateTable, SourceError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateSource;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use dashmap::DashMap;
    use parking_lot::RwLock;
    use ratecache_common::{AsOf, Currency, RateTable};

    use super::RateSource;
    use crate::error::SourceError;

    /// In-memory rate source for tests.
    pub struct MockRateSource {
        name: String,
        default_base: Option<Currency>,
        tables: DashMap<(Currency, AsOf), HashMap<String, f64>>,
        forced_base: RwLock<Option<Currency>>,
        failure: RwLock<Option<SourceError>>,
        delay: RwLock<Duration>,
        calls: AtomicUsize,
    }

    impl MockRateSource {
        /// Create a new mock source.
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                default_base: None,
                tables: DashMap::new(),
                forced_base: RwLock::new(None),
                failure: RwLock::new(None),
                delay: RwLock::new(Duration::ZERO),
                calls: AtomicUsize::new(0),
            }
        }

        /// Report `base` as the provider default.
        pub fn with_default_base(mut self, base: Currency) -> Self {
            self.default_base = Some(base);
            self
        }

        /// Set the table served for `base` at `as_of`.
        pub fn set_rates(&self, base: Currency, as_of: AsOf, rates: &[(&str, f64)]) {
            let rates = rates
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect();
            self.tables.insert((base, as_of), rates);
        }

        /// Ignore the requested base and always answer with `base`.
        pub fn force_base(&self, base: Option<Currency>) {
            *self.forced_base.write() = base;
        }

        /// Fail every fetch with `error` until cleared with `None`.
        pub fn set_failure(&self, error: Option<SourceError>) {
            *self.failure.write() = error;
        }

        /// Delay every fetch by `delay`.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.write() = delay;
        }

        /// Number of fetches issued so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for MockRateSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn default_base(&self) -> Option<Currency> {
            self.default_base.clone()
        }

        async fn fetch(&self, base: &Currency, as_of: AsOf) -> Result<RateTable, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.read();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if let Some(error) = self.failure.read().clone() {
                return Err(error);
            }

            let served = self.forced_base.read().clone().unwrap_or_else(|| base.clone());
            self.tables
                .get(&(served.clone(), as_of))
                .map(|rates| RateTable::new(served.clone(), rates.clone()))
                .ok_or_else(|| SourceError::Status {
                    status: 404,
                    code: "not_found".to_string(),
                    description: format!("no rates for {} at {}", served, as_of),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_mock_source_serves_configured_table() {
        let source = MockRateSource::new("test");
        source.set_rates(Currency::aud(), AsOf::Latest, &[("NZD", 1.08)]);

        let table = source.fetch(&Currency::aud(), AsOf::Latest).await.unwrap();

        assert_eq!(table.base, Currency::aud());
        assert_eq!(table.rate("NZD"), Some(1.08));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_unknown_table() {
        let source = MockRateSource::new("test");

        let result = source.fetch(&Currency::eur(), AsOf::Latest).await;

        assert!(matches!(result, Err(SourceError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_mock_source_forced_base_and_failure() {
        let source = MockRateSource::new("test");
        source.set_rates(Currency::usd(), AsOf::Latest, &[("AUD", 1.35)]);
        source.force_base(Some(Currency::usd()));

        let table = source.fetch(&Currency::aud(), AsOf::Latest).await.unwrap();
        assert_eq!(table.base, Currency::usd());

        source.set_failure(Some(SourceError::Timeout(Duration::from_secs(1))));
        assert!(source.fetch(&Currency::aud(), AsOf::Latest).await.is_err());
        assert_eq!(source.calls(), 2);
    }
}
