//! Rate lookup error types.

use std::time::Duration;

use ratecache_common::Currency;
use thiserror::Error;

use crate::cache::CacheKey;

/// Failure reported by a rate source for a single fetch.
///
/// Cloneable so that one failed refresh can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// The request never produced a response (connect, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status} ({code}): {description}")]
    Status {
        status: u16,
        code: String,
        description: String,
    },

    /// Upstream refuses to quote against the requested base currency.
    #[error("Base currency switching not permitted (requested {requested}): {description}")]
    BaseSwitchNotPermitted {
        requested: Currency,
        description: String,
    },

    /// Response body could not be decoded into a rate table.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Fetch did not complete within the configured bound.
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Check if a later attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Transport(_) | SourceError::Timeout(_) => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::BaseSwitchNotPermitted { .. } | SourceError::Decode(_) => false,
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            SourceError::Transport(_) => "TRANSPORT",
            SourceError::Status { .. } => "UPSTREAM_STATUS",
            SourceError::BaseSwitchNotPermitted { .. } => "BASE_SWITCH_NOT_PERMITTED",
            SourceError::Decode(_) => "DECODE",
            SourceError::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Errors returned by the rate lookup service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FxError {
    /// Base currency missing or malformed.
    #[error("Invalid base currency: {0}")]
    InvalidBase(String),

    /// Quoted currency code missing.
    #[error("Invalid currency code: {0}")]
    InvalidCode(String),

    /// Rate table could not be fetched.
    #[error("Rate source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// Table was resolved but does not quote the requested code.
    #[error("No rate for {code} against {base}")]
    RateNotFound { base: Currency, code: String },

    /// The refresh this call was waiting on was dropped before finishing.
    #[error("Refresh for {0} was cancelled")]
    RefreshCancelled(CacheKey),
}

impl FxError {
    /// Check if re-issuing the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FxError::SourceUnavailable(source) => source.is_retryable(),
            FxError::RefreshCancelled(_) => true,
            FxError::InvalidBase(_) | FxError::InvalidCode(_) | FxError::RateNotFound { .. } => {
                false
            }
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidBase(_) => "INVALID_BASE",
            FxError::InvalidCode(_) => "INVALID_CODE",
            FxError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            FxError::RateNotFound { .. } => "RATE_NOT_FOUND",
            FxError::RefreshCancelled(_) => "REFRESH_CANCELLED",
        }
    }
}

/// Result type for rate lookups.
pub type FxResult<T> = Result<T, FxError>;
