//! Binance market data source.
//!
//! This module provides XRP/USDT data from the Binance spot API:
//! - Current price and market snapshot via /api/v3/ticker/24hr
//! - Historical series via /api/v3/klines
//!
//! Binance enforces a weight-based quota per IP (request weight per minute)
//! rather than a plain request count, so this source uses a weighted policy.
//! API documentation: https://developers.binance.com/docs/binance-spot-api-docs

mod models;

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SourceSettings;
use crate::errors::MarketDataError;
use crate::models::{
    json_number, DataType, HistoryPeriod, RawHistory, RawMarket, RawPrice, RawPricePoint,
};
use crate::provider::http::{join_url, HttpFetcher};
use crate::provider::{MarketDataSource, RateLimitPolicy, SourceDescriptor};

use models::{KlineRow, Ticker24hr, KLINE_CLOSE, KLINE_OPEN_TIME};

pub const PROVIDER_ID: &str = "BINANCE";

/// Weight budget per minute we allow ourselves.
const WEIGHT_PER_MINUTE: u32 = 1200;

/// Weight of a single-symbol 24hr ticker or a klines request.
const REQUEST_WEIGHT: u32 = 2;

/// Binance source.
pub struct BinanceSource {
    descriptor: SourceDescriptor,
    http: HttpFetcher,
}

impl BinanceSource {
    /// Create a Binance source for the trading pair `symbol` (e.g. "XRPUSDT").
    pub fn new(settings: &SourceSettings, symbol: &str, timeout: Duration) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id: Cow::Borrowed(PROVIDER_ID),
                base_url: settings.base_url.clone(),
                backup_url: settings.backup_url.clone(),
                priority: settings.priority,
                rate_limit: RateLimitPolicy::Weighted {
                    capacity: WEIGHT_PER_MINUTE,
                    window: Duration::from_secs(60),
                },
                symbol: symbol.to_string(),
            },
            http: HttpFetcher::new(PROVIDER_ID, timeout),
        }
    }

    /// Kline interval and row count covering a period.
    fn kline_params(period: HistoryPeriod) -> (&'static str, u32) {
        match period {
            HistoryPeriod::Day => ("15m", 96),
            HistoryPeriod::Week => ("1h", 168),
            HistoryPeriod::Month => ("4h", 180),
            HistoryPeriod::Quarter => ("1d", 90),
            HistoryPeriod::Year => ("1d", 365),
        }
    }

    async fn ticker(&self, base_url: &str) -> Result<Ticker24hr, MarketDataError> {
        self.http
            .get_json(
                &join_url(base_url, "/api/v3/ticker/24hr"),
                &[("symbol", self.descriptor.symbol.clone())],
            )
            .await
    }

    fn map_ticker_price(ticker: &Ticker24hr) -> RawPrice {
        RawPrice {
            usd: ticker.last_price,
            change_24h: ticker.price_change_percent,
            volume_24h: ticker.quote_volume,
            market_cap: None,
            high_24h: ticker.high_price,
            low_24h: ticker.low_price,
            last_updated_at: ticker.close_time.map(|ms| ms / 1000),
        }
    }

    fn map_ticker_market(ticker: &Ticker24hr) -> RawMarket {
        RawMarket {
            current_price: ticker.last_price,
            market_cap: None,
            total_volume: ticker.quote_volume,
            price_change_24h: ticker.price_change,
            price_change_percentage_24h: ticker.price_change_percent,
            high_24h: ticker.high_price,
            low_24h: ticker.low_price,
            circulating_supply: None,
            total_supply: None,
            market_cap_rank: None,
            last_updated_at: ticker.close_time.map(|ms| ms / 1000),
        }
    }

    fn map_klines(rows: &[KlineRow]) -> RawHistory {
        RawHistory::new(
            rows.iter()
                .map(|row| RawPricePoint {
                    timestamp: row.get(KLINE_OPEN_TIME).and_then(json_number),
                    price: row.get(KLINE_CLOSE).and_then(json_number),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl MarketDataSource for BinanceSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn weight(&self, _data_type: DataType) -> u32 {
        REQUEST_WEIGHT
    }

    async fn fetch_price(&self, base_url: &str) -> Result<RawPrice, MarketDataError> {
        let ticker = self.ticker(base_url).await?;
        Ok(Self::map_ticker_price(&ticker))
    }

    async fn fetch_history(
        &self,
        base_url: &str,
        period: HistoryPeriod,
    ) -> Result<RawHistory, MarketDataError> {
        let (interval, limit) = Self::kline_params(period);
        let rows: Vec<KlineRow> = self
            .http
            .get_json(
                &join_url(base_url, "/api/v3/klines"),
                &[
                    ("symbol", self.descriptor.symbol.clone()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        debug!("Binance returned {} klines at {}", rows.len(), interval);

        Ok(Self::map_klines(&rows))
    }

    async fn fetch_market(&self, base_url: &str) -> Result<RawMarket, MarketDataError> {
        let ticker = self.ticker(base_url).await?;
        Ok(Self::map_ticker_market(&ticker))
    }
}
