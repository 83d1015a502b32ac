//! ratecache common types
//!
//! Shared types used across the ratecache workspace: currency codes, as-of
//! selectors, rate tables and time helpers.

pub mod currency;
pub mod rates;
pub mod error;
pub mod time;

pub use currency::*;
pub use rates::*;
pub use error::*;
pub use time::*;
