//! Currency codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// ISO 4217 currency code, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    ///
    /// The code is trimmed and upper-cased but otherwise not validated; use
    /// [`Currency::parse`] for caller-supplied input.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Parse and validate a three-letter alphabetic code.
    pub fn parse(code: &str) -> Result<Self, CommonError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(CommonError::EmptyCurrency);
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CommonError::InvalidCurrency(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn aud() -> Self {
        Self::new("AUD")
    }

    pub fn nzd() -> Self {
        Self::new("NZD")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!(Currency::parse(" aud ").unwrap(), Currency::aud());
        assert_eq!(Currency::parse("NzD").unwrap().code(), "NZD");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!(matches!(Currency::parse(""), Err(CommonError::EmptyCurrency)));
        assert!(matches!(Currency::parse("   "), Err(CommonError::EmptyCurrency)));
        assert!(matches!(
            Currency::parse("US"),
            Err(CommonError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Currency::parse("U5D"),
            Err(CommonError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip_uses_plain_code() {
        let json = serde_json::to_string(&Currency::aud()).unwrap();
        assert_eq!(json, "\"AUD\"");

        let parsed: Currency = serde_json::from_str("\"nzd\"").unwrap();
        assert_eq!(parsed, Currency::nzd());

        assert!(serde_json::from_str::<Currency>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_parse_is_case_insensitive(code in "[a-zA-Z]{3}") {
            let lower = Currency::parse(&code.to_lowercase()).unwrap();
            let upper = Currency::parse(&code.to_uppercase()).unwrap();
            prop_assert_eq!(&lower, &upper);
            prop_assert_eq!(lower.code(), code.to_uppercase());
        }
    }
}
