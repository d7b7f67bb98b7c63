//! Shared HTTP plumbing for source adapters.
//!
//! Wraps a `reqwest::Client` with the per-request timeout and maps transport
//! and status failures into `MarketDataError` the same way for every source.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::json_number;

/// JSON-over-HTTP GET helper bound to one source.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    provider: &'static str,
}

impl HttpFetcher {
    pub fn new(provider: &'static str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("xrpwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, provider }
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        debug!("{} request: {} with {} params", self.provider, url, params.len());

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: self.provider.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::HttpStatus {
                provider: self.provider.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        serde_json::from_str(&body).map_err(|e| MarketDataError::InvalidPayload {
            provider: self.provider.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> MarketDataError {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: self.provider.to_string(),
            }
        } else {
            MarketDataError::Network(e)
        }
    }
}

/// Deserialize a number that may arrive as a JSON number, a numeric string or null.
/// Unparseable values become `None` instead of failing the whole payload.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_number))
}

/// Same as [`lenient_f64`] for integer fields (timestamps, ranks).
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| v.is_finite())
        .map(|v| v as i64))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
