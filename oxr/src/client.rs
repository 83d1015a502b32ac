//! HTTP client for the Open Exchange Rates API.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use ratecache_common::{from_unix, AsOf, Currency, RateTable, DATE_FORMAT};
use ratecache_fx::{RateSource, SourceError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::OxrConfig;
use crate::error::{OxrError, OxrResult};

/// Base the API quotes against when no `base` parameter is sent.
pub const OXR_DEFAULT_BASE: &str = "USD";

const LATEST_PATH: &str = "latest.json";
const CURRENCIES_PATH: &str = "currencies.json";

/// A currency the API can quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RatesBody {
    timestamp: i64,
    base: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Open Exchange Rates client.
#[derive(Clone)]
pub struct OxrClient {
    http: reqwest::Client,
    app_id: String,
    base_url: Url,
}

impl OxrClient {
    pub fn new(config: OxrConfig) -> OxrResult<Self> {
        config.validate().map_err(OxrError::InvalidConfig)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.parsed_base_url()?,
            app_id: config.app_id,
        })
    }

    /// Build an absolute request URL for `path`.
    ///
    /// Authenticated requests carry `app_id` ahead of `params`.
    pub fn request_url(&self, path: &str, params: &[(&str, &str)], authed: bool) -> OxrResult<Url> {
        let mut url = self.base_url.join(path)?;

        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        if authed {
            pairs.push(("app_id", self.app_id.as_str()));
        }
        pairs.extend_from_slice(params);

        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Fetch the most recent rates, quoted against `base` or the account default.
    #[instrument(skip(self))]
    pub async fn latest(&self, base: Option<&Currency>) -> OxrResult<RateTable> {
        self.rates(LATEST_PATH, base).await
    }

    /// Fetch end-of-day rates for `date`.
    #[instrument(skip(self))]
    pub async fn historical(&self, date: NaiveDate, base: Option<&Currency>) -> OxrResult<RateTable> {
        let path = format!("historical/{}.json", date.format(DATE_FORMAT));
        self.rates(&path, base).await
    }

    /// List every currency the API knows, sorted by code.
    #[instrument(skip(self))]
    pub async fn currencies(&self) -> OxrResult<Vec<CurrencyInfo>> {
        let url = self.request_url(CURRENCIES_PATH, &[], false)?;
        let names: HashMap<String, String> = self.get_json(url, None).await?;

        let mut currencies: Vec<CurrencyInfo> = names
            .into_iter()
            .map(|(code, name)| CurrencyInfo { code, name })
            .collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(currencies)
    }

    async fn rates(&self, path: &str, base: Option<&Currency>) -> OxrResult<RateTable> {
        let url = match base {
            Some(base) => self.request_url(path, &[("base", base.code())], true)?,
            None => self.request_url(path, &[], true)?,
        };

        let body: RatesBody = self.get_json(url, base).await?;
        let returned = Currency::parse(&body.base)
            .map_err(|e| OxrError::Decode(format!("response base: {}", e)))?;

        let mut table = RateTable::new(returned, body.rates);
        if let Some(published_at) = from_unix(body.timestamp) {
            table = table.with_published_at(published_at);
        }
        Ok(table)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        requested_base: Option<&Currency>,
    ) -> OxrResult<T> {
        debug!(path = url.path(), "OXR request");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = Self::api_error(status, &body, requested_base);
            warn!(status = status.as_u16(), error = %err, "OXR request failed");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| OxrError::Decode(e.to_string()))
    }

    fn api_error(
        status: reqwest::StatusCode,
        body: &[u8],
        requested_base: Option<&Currency>,
    ) -> OxrError {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let code = parsed
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        let description = parsed
            .description
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

        match requested_base {
            Some(requested) if status == reqwest::StatusCode::FORBIDDEN && code == "not_allowed" => {
                OxrError::BaseSwitchNotPermitted {
                    requested: requested.clone(),
                    description,
                }
            }
            _ => OxrError::Api {
                status: status.as_u16(),
                code,
                description,
            },
        }
    }
}

#[async_trait]
impl RateSource for OxrClient {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    fn default_base(&self) -> Option<Currency> {
        Some(Currency::new(OXR_DEFAULT_BASE))
    }

    async fn fetch(&self, base: &Currency, as_of: AsOf) -> Result<RateTable, SourceError> {
        // USD is implied; sending it would trip plans without base switching.
        let base = (base.code() != OXR_DEFAULT_BASE).then_some(base);

        let result = match as_of {
            AsOf::Latest => self.latest(base).await,
            AsOf::Date(date) => self.historical(date, base).await,
        };
        result.map_err(SourceError::from)
    }
}
