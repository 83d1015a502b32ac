//! Open Exchange Rates client errors.

use ratecache_common::Currency;
use ratecache_fx::SourceError;
use thiserror::Error;

/// Errors raised by [`OxrClient`](crate::OxrClient).
#[derive(Debug, Error)]
pub enum OxrError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx reply carrying the API's error body.
    #[error("{status} {description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },

    /// The account plan does not allow quoting against `requested`.
    #[error("{description}")]
    BaseSwitchNotPermitted {
        requested: Currency,
        description: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type OxrResult<T> = Result<T, OxrError>;

impl From<OxrError> for SourceError {
    fn from(err: OxrError) -> Self {
        match err {
            OxrError::Api {
                status,
                code,
                description,
            } => SourceError::Status {
                status,
                code,
                description,
            },
            OxrError::BaseSwitchNotPermitted {
                requested,
                description,
            } => SourceError::BaseSwitchNotPermitted {
                requested,
                description,
            },
            OxrError::Decode(msg) => SourceError::Decode(msg),
            OxrError::Http(e) if e.is_decode() => SourceError::Decode(e.to_string()),
            other => SourceError::Transport(other.to_string()),
        }
    }
}
