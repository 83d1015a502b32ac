//! Open Exchange Rates client configuration.

use std::time::Duration;

use ratecache_common::parse_millis;
use url::Url;

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://openexchangerates.org/api/";

/// Configuration for [`OxrClient`](crate::OxrClient).
#[derive(Debug, Clone)]
pub struct OxrConfig {
    /// Application id sent as `app_id` on authenticated requests.
    pub app_id: String,
    /// API root that endpoint paths are resolved against.
    pub base_url: String,
    pub user_agent: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for OxrConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("ratecache/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OxrConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(app_id) = std::env::var("OPEN_EXCHANGE_APP_ID") {
            config.app_id = app_id.trim().to_string();
        }

        if let Ok(url) = std::env::var("OXR_BASE_URL") {
            config.base_url = url;
        }

        if let Ok(timeout) = std::env::var("OXR_TIMEOUT_MS") {
            if let Some(timeout) = parse_millis(&timeout) {
                config.request_timeout = timeout;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.trim().is_empty() {
            return Err("OXR app id cannot be empty".to_string());
        }

        if let Err(e) = self.parsed_base_url() {
            return Err(format!("Invalid OXR base URL '{}': {}", self.base_url, e));
        }

        if self.request_timeout.is_zero() {
            return Err("OXR request timeout cannot be zero".to_string());
        }

        Ok(())
    }

    /// Base URL with a trailing slash so relative paths append to it.
    pub(crate) fn parsed_base_url(&self) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
    }
}
