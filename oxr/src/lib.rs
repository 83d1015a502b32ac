//! Open Exchange Rates source for ratecache.
//!
//! [`OxrClient`] talks to the `openexchangerates.org` JSON API and
//! implements [`RateSource`](ratecache_fx::RateSource) so it can back a
//! [`RateLookupService`](ratecache_fx::RateLookupService).

pub mod client;
pub mod config;
pub mod error;

pub use client::{CurrencyInfo, OxrClient, OXR_DEFAULT_BASE};
pub use config::OxrConfig;
pub use error::{OxrError, OxrResult};
