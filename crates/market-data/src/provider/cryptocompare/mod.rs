//! CryptoCompare market data source.
//!
//! Provides XRP data from the min-api:
//! - Current price and market snapshot via /data/pricemultifull
//! - Historical series via /data/v2/histohour or /data/v2/histoday
//!
//! Errors come back as HTTP 200 with `"Response": "Error"` and a `Message`.
//! API documentation: https://min-api.cryptocompare.com/documentation

mod models;

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SourceSettings;
use crate::errors::MarketDataError;
use crate::models::{HistoryPeriod, RawHistory, RawMarket, RawPrice};
use crate::provider::http::{join_url, HttpFetcher};
use crate::provider::{MarketDataSource, RateLimitPolicy, SourceDescriptor};

use models::{is_error_response, HistoResponse, PriceMultiFullResponse, RawQuote};

pub const PROVIDER_ID: &str = "CRYPTOCOMPARE";

const QUOTE_CURRENCY: &str = "USD";

/// CryptoCompare source.
pub struct CryptoCompareSource {
    descriptor: SourceDescriptor,
    http: HttpFetcher,
}

impl CryptoCompareSource {
    /// Create a CryptoCompare source for the ticker `symbol` (e.g. "XRP").
    pub fn new(settings: &SourceSettings, symbol: &str, timeout: Duration) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id: Cow::Borrowed(PROVIDER_ID),
                base_url: settings.base_url.clone(),
                backup_url: settings.backup_url.clone(),
                priority: settings.priority,
                rate_limit: RateLimitPolicy::Interval {
                    requests: 50,
                    window: Duration::from_secs(60),
                },
                symbol: symbol.to_string(),
            },
            http: HttpFetcher::new(PROVIDER_ID, timeout),
        }
    }

    /// Histo endpoint and row count for a period.
    fn histo_params(period: HistoryPeriod) -> (&'static str, u32) {
        match period {
            HistoryPeriod::Day => ("/data/v2/histohour", 24),
            HistoryPeriod::Week => ("/data/v2/histohour", 168),
            HistoryPeriod::Month => ("/data/v2/histoday", 30),
            HistoryPeriod::Quarter => ("/data/v2/histoday", 90),
            HistoryPeriod::Year => ("/data/v2/histoday", 365),
        }
    }

    fn provider_error(message: Option<String>) -> MarketDataError {
        MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: message.unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    fn extract_quote(
        mut response: PriceMultiFullResponse,
        symbol: &str,
    ) -> Result<RawQuote, MarketDataError> {
        if is_error_response(&response.response) {
            return Err(Self::provider_error(response.message));
        }

        response
            .raw
            .remove(symbol)
            .and_then(|mut by_currency| by_currency.remove(QUOTE_CURRENCY))
            .ok_or_else(|| MarketDataError::InvalidPayload {
                provider: PROVIDER_ID.to_string(),
                message: format!("RAW.{}.{} missing", symbol, QUOTE_CURRENCY),
            })
    }

    fn map_price(quote: &RawQuote) -> RawPrice {
        RawPrice {
            usd: quote.price,
            change_24h: quote.change_pct_24hour,
            volume_24h: quote.volume_24hour_to,
            market_cap: quote.mktcap,
            high_24h: quote.high_24hour,
            low_24h: quote.low_24hour,
            last_updated_at: quote.lastupdate,
        }
    }

    fn map_market(quote: &RawQuote) -> RawMarket {
        RawMarket {
            current_price: quote.price,
            market_cap: quote.mktcap,
            total_volume: quote.volume_24hour_to,
            price_change_24h: quote.change_24hour,
            price_change_percentage_24h: quote.change_pct_24hour,
            high_24h: quote.high_24hour,
            low_24h: quote.low_24hour,
            circulating_supply: quote.circulatingsupply.or(quote.supply),
            total_supply: quote.supply,
            market_cap_rank: None,
            last_updated_at: quote.lastupdate,
        }
    }

    fn map_histo(response: HistoResponse) -> Result<RawHistory, MarketDataError> {
        if is_error_response(&response.response) {
            return Err(Self::provider_error(response.message));
        }

        let data = response.data.ok_or_else(|| MarketDataError::InvalidPayload {
            provider: PROVIDER_ID.to_string(),
            message: "Data missing".to_string(),
        })?;

        Ok(RawHistory::from_json_entries(&data.data))
    }

    async fn quote(&self, base_url: &str) -> Result<RawQuote, MarketDataError> {
        let response: PriceMultiFullResponse = self
            .http
            .get_json(
                &join_url(base_url, "/data/pricemultifull"),
                &[
                    ("fsyms", self.descriptor.symbol.clone()),
                    ("tsyms", QUOTE_CURRENCY.to_string()),
                ],
            )
            .await?;

        Self::extract_quote(response, &self.descriptor.symbol)
    }
}

#[async_trait]
impl MarketDataSource for CryptoCompareSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch_price(&self, base_url: &str) -> Result<RawPrice, MarketDataError> {
        let quote = self.quote(base_url).await?;
        Ok(Self::map_price(&quote))
    }

    async fn fetch_history(
        &self,
        base_url: &str,
        period: HistoryPeriod,
    ) -> Result<RawHistory, MarketDataError> {
        let (path, limit) = Self::histo_params(period);
        let response: HistoResponse = self
            .http
            .get_json(
                &join_url(base_url, path),
                &[
                    ("fsym", self.descriptor.symbol.clone()),
                    ("tsym", QUOTE_CURRENCY.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let history = Self::map_histo(response)?;
        debug!("CryptoCompare returned {} rows from {}", history.points.len(), path);
        Ok(history)
    }

    async fn fetch_market(&self, base_url: &str) -> Result<RawMarket, MarketDataError> {
        let quote = self.quote(base_url).await?;
        Ok(Self::map_market(&quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPricePoint;

    #[test]
    fn test_extract_quote_and_map_price() {
        let response: PriceMultiFullResponse = serde_json::from_str(
            r#"{"RAW": {"XRP": {"USD": {
                "PRICE": 2.85, "CHANGEPCT24HOUR": 1.2, "CHANGE24HOUR": 0.034,
                "VOLUME24HOURTO": 9000000000, "MKTCAP": 162000000000,
                "HIGH24HOUR": 2.9, "LOW24HOUR": 2.8, "LASTUPDATE": 1700000000,
                "SUPPLY": 99987000000, "CIRCULATINGSUPPLY": 57000000000
            }}}}"#,
        )
        .unwrap();

        let quote = CryptoCompareSource::extract_quote(response, "XRP").unwrap();
        let raw = CryptoCompareSource::map_price(&quote);
        assert_eq!(raw.usd, Some(2.85));
        assert_eq!(raw.change_24h, Some(1.2));
        assert_eq!(raw.market_cap, Some(162e9));
        assert_eq!(raw.last_updated_at, Some(1_700_000_000));

        let market = CryptoCompareSource::map_market(&quote);
        assert_eq!(market.price_change_24h, Some(0.034));
        assert_eq!(market.circulating_supply, Some(57e9));
        assert_eq!(market.total_supply, Some(99.987e9));
    }

    #[test]
    fn test_in_band_error_is_provider_error() {
        let response: PriceMultiFullResponse = serde_json::from_str(
            r#"{"Response": "Error", "Message": "rate limit exceeded"}"#,
        )
        .unwrap();

        match CryptoCompareSource::extract_quote(response, "XRP") {
            Err(MarketDataError::ProviderError { message, .. }) => {
                assert_eq!(message, "rate limit exceeded")
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_pair_is_invalid_payload() {
        let response: PriceMultiFullResponse =
            serde_json::from_str(r#"{"RAW": {"BTC": {}}}"#).unwrap();
        let err = CryptoCompareSource::extract_quote(response, "XRP").unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidPayload { .. }));
    }

    #[test]
    fn test_map_histo() {
        let response: HistoResponse = serde_json::from_str(
            r#"{"Response": "Success", "Data": {"Aggregated": false, "Data": [
                {"time": 1700000000, "close": 2.8, "open": 2.7},
                {"time": 1700003600, "close": 2.9}
            ]}}"#,
        )
        .unwrap();

        let history = CryptoCompareSource::map_histo(response).unwrap();
        assert_eq!(history.points.len(), 2);
        assert_eq!(history.points[1], RawPricePoint::new(1_700_003_600.0, 2.9));
    }

    #[test]
    fn test_histo_params() {
        assert_eq!(
            CryptoCompareSource::histo_params(HistoryPeriod::Day),
            ("/data/v2/histohour", 24)
        );
        assert_eq!(
            CryptoCompareSource::histo_params(HistoryPeriod::Year),
            ("/data/v2/histoday", 365)
        );
    }
}
