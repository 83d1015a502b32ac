//! Rate tables and as-of selectors.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::currency::Currency;
use crate::error::CommonError;

/// Format used for historical dates on the wire and on the command line.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which point in time a rate table describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsOf {
    /// Most recent rates published by the provider.
    #[default]
    Latest,
    /// End-of-day rates for a calendar date.
    Date(NaiveDate),
}

impl AsOf {
    /// Selector for a historical date.
    pub fn date(date: NaiveDate) -> Self {
        AsOf::Date(date)
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, AsOf::Latest)
    }
}

impl fmt::Display for AsOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsOf::Latest => write!(f, "latest"),
            AsOf::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
        }
    }
}

impl FromStr for AsOf {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(AsOf::Latest);
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(AsOf::Date)
            .map_err(|_| CommonError::InvalidDate(s.to_string()))
    }
}

impl From<NaiveDate> for AsOf {
    fn from(date: NaiveDate) -> Self {
        AsOf::Date(date)
    }
}

/// Exchange rates for every quoted currency relative to one base.
///
/// One unit of `base` buys `rates[code]` units of `code`. Tables are never
/// mutated after construction; caches share them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// Currency the rates are expressed against.
    pub base: Currency,
    /// Rate per quoted currency code.
    pub rates: HashMap<String, f64>,
    /// When this table was obtained from the provider.
    pub fetched_at: DateTime<Utc>,
    /// Provider publication time, when reported.
    pub published_at: Option<DateTime<Utc>>,
}

impl RateTable {
    /// Create a table fetched now.
    pub fn new(base: Currency, rates: HashMap<String, f64>) -> Self {
        Self {
            base,
            rates,
            fetched_at: Utc::now(),
            published_at: None,
        }
    }

    /// Attach the provider's publication timestamp.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Look up the rate for a currency code (case-insensitive).
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .or_else(|| self.rates.get(&code.trim().to_uppercase()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Currency codes in this table, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}
