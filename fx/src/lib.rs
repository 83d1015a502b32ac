//! ratecache FX core
//!
//! In-memory, cache-aside access to exchange-rate tables.
//!
//! # Features
//!
//! - Tables keyed by base currency and as-of selector (latest or a date)
//! - Uniform TTL with lazy eviction of stale entries
//! - Single-flight refreshes: one upstream fetch per cold key, shared by
//!   every concurrent caller
//! - Fetch failures surfaced to callers, never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratecache_fx::{RateLookupService, ServiceConfig};
//! use ratecache_common::AsOf;
//!
//! let service = RateLookupService::new(Arc::new(source), ServiceConfig::default());
//!
//! // Full table
//! let table = service.list("AUD", AsOf::Latest).await?;
//!
//! // Single rate
//! let nzd = service.get_rate("AUD", AsOf::Latest, "NZD").await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod single_flight;
pub mod source;

pub use cache::{CacheConfig, CacheKey, CacheStats, CacheStore, SharedCacheStore};
pub use config::ServiceConfig;
pub use error::{FxError, FxResult, SourceError};
pub use metrics::ServiceStats;
pub use service::RateLookupService;
pub use single_flight::SingleFlight;
pub use source::RateSource;

#[cfg(any(test, feature = "test-utils"))]
pub use source::MockRateSource;
