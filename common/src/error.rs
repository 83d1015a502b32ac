//! Errors for shared types.

use thiserror::Error;

/// Validation errors raised when parsing shared types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Empty currency code.
    #[error("Currency code cannot be empty")]
    EmptyCurrency,

    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Date is not in YYYY-MM-DD form.
    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
}
