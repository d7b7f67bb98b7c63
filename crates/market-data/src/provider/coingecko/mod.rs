//! CoinGecko market data source.
//!
//! This module provides XRP data from the public CoinGecko API:
//! - Current price via /simple/price (with 24h change, volume and market cap)
//! - Historical series via /coins/{id}/market_chart
//! - Market snapshot via /coins/{id}
//!
//! The free tier allows roughly 10-30 calls per minute; we stay at the low end.
//! API documentation: https://docs.coingecko.com/reference/introduction

mod models;

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::debug;

use crate::config::SourceSettings;
use crate::errors::MarketDataError;
use crate::models::{HistoryPeriod, RawHistory, RawMarket, RawPrice};
use crate::provider::http::{join_url, HttpFetcher};
use crate::provider::{MarketDataSource, RateLimitPolicy, SourceDescriptor};

use models::{CoinResponse, MarketChartResponse, SimplePriceResponse, UsdValue};

pub const PROVIDER_ID: &str = "COINGECKO";

/// CoinGecko source.
pub struct CoinGeckoSource {
    descriptor: SourceDescriptor,
    http: HttpFetcher,
}

impl CoinGeckoSource {
    /// Create a CoinGecko source for the coin id `symbol` (e.g. "ripple").
    pub fn new(settings: &SourceSettings, symbol: &str, timeout: Duration) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id: Cow::Borrowed(PROVIDER_ID),
                base_url: settings.base_url.clone(),
                backup_url: settings.backup_url.clone(),
                priority: settings.priority,
                rate_limit: RateLimitPolicy::Interval {
                    requests: 10,
                    window: Duration::from_secs(60),
                },
                symbol: symbol.to_string(),
            },
            http: HttpFetcher::new(PROVIDER_ID, timeout),
        }
    }

    fn map_simple_price(
        mut response: SimplePriceResponse,
        coin_id: &str,
    ) -> Result<RawPrice, MarketDataError> {
        let entry = response
            .remove(coin_id)
            .ok_or_else(|| MarketDataError::InvalidPayload {
                provider: PROVIDER_ID.to_string(),
                message: format!("coin '{}' missing from response", coin_id),
            })?;

        Ok(RawPrice {
            usd: entry.usd,
            change_24h: entry.usd_24h_change,
            volume_24h: entry.usd_24h_vol,
            market_cap: entry.usd_market_cap,
            high_24h: None,
            low_24h: None,
            last_updated_at: entry.last_updated_at,
        })
    }

    fn map_coin(response: CoinResponse) -> Result<RawMarket, MarketDataError> {
        let data = response
            .market_data
            .ok_or_else(|| MarketDataError::InvalidPayload {
                provider: PROVIDER_ID.to_string(),
                message: "market_data missing".to_string(),
            })?;

        let last_updated_at = response
            .last_updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp());

        Ok(RawMarket {
            current_price: UsdValue::usd_of(&data.current_price),
            market_cap: UsdValue::usd_of(&data.market_cap),
            total_volume: UsdValue::usd_of(&data.total_volume),
            price_change_24h: data.price_change_24h,
            price_change_percentage_24h: data.price_change_percentage_24h,
            high_24h: UsdValue::usd_of(&data.high_24h),
            low_24h: UsdValue::usd_of(&data.low_24h),
            circulating_supply: data.circulating_supply,
            total_supply: data.total_supply,
            market_cap_rank: response
                .market_cap_rank
                .and_then(|r| u32::try_from(r).ok()),
            last_updated_at,
        })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch_price(&self, base_url: &str) -> Result<RawPrice, MarketDataError> {
        let coin_id = self.descriptor.symbol.as_str();
        let response: SimplePriceResponse = self
            .http
            .get_json(
                &join_url(base_url, "/simple/price"),
                &[
                    ("ids", coin_id.to_string()),
                    ("vs_currencies", "usd".to_string()),
                    ("include_24hr_change", "true".to_string()),
                    ("include_24hr_vol", "true".to_string()),
                    ("include_market_cap", "true".to_string()),
                    ("include_last_updated_at", "true".to_string()),
                ],
            )
            .await?;

        Self::map_simple_price(response, coin_id)
    }

    async fn fetch_history(
        &self,
        base_url: &str,
        period: HistoryPeriod,
    ) -> Result<RawHistory, MarketDataError> {
        let path = format!("/coins/{}/market_chart", self.descriptor.symbol);
        let response: MarketChartResponse = self
            .http
            .get_json(
                &join_url(base_url, &path),
                &[
                    ("vs_currency", "usd".to_string()),
                    ("days", period.days().to_string()),
                ],
            )
            .await?;

        debug!(
            "CoinGecko returned {} history rows for {} days",
            response.prices.len(),
            period.days()
        );

        Ok(RawHistory::from_json_entries(&response.prices))
    }

    async fn fetch_market(&self, base_url: &str) -> Result<RawMarket, MarketDataError> {
        let path = format!("/coins/{}", self.descriptor.symbol);
        let response: CoinResponse = self
            .http
            .get_json(
                &join_url(base_url, &path),
                &[
                    ("localization", "false".to_string()),
                    ("tickers", "false".to_string()),
                    ("community_data", "false".to_string()),
                    ("developer_data", "false".to_string()),
                ],
            )
            .await?;

        Self::map_coin(response)
    }
}
