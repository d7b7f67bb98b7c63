//! CoinGecko API response models.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::provider::http::{lenient_f64, lenient_i64};

/// Response of `/simple/price`, keyed by coin id.
pub type SimplePriceResponse = HashMap<String, SimplePriceEntry>;

/// Per-coin entry of `/simple/price` with `include_24hr_*` flags set.
#[derive(Debug, Default, Deserialize)]
pub struct SimplePriceEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_24h_change: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_24h_vol: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_updated_at: Option<i64>,
}

/// Response of `/coins/{id}/market_chart`.
#[derive(Debug, Deserialize)]
pub struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs; kept loose so bad rows can be dropped one by one.
    #[serde(default)]
    pub prices: Vec<Value>,
}

/// Response of `/coins/{id}`.
#[derive(Debug, Deserialize)]
pub struct CoinResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub market_cap_rank: Option<i64>,
    pub market_data: Option<CoinMarketData>,
    /// ISO-8601 timestamp
    pub last_updated: Option<String>,
}

/// `market_data` block of `/coins/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct CoinMarketData {
    #[serde(default)]
    pub current_price: Option<UsdValue>,
    #[serde(default)]
    pub market_cap: Option<UsdValue>,
    #[serde(default)]
    pub total_volume: Option<UsdValue>,
    #[serde(default)]
    pub high_24h: Option<UsdValue>,
    #[serde(default)]
    pub low_24h: Option<UsdValue>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub circulating_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_supply: Option<f64>,
}

/// Per-currency value map, of which only USD is read.
#[derive(Debug, Default, Deserialize)]
pub struct UsdValue {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd: Option<f64>,
}

impl UsdValue {
    /// USD value of an optional per-currency map.
    pub fn usd_of(value: &Option<UsdValue>) -> Option<f64> {
        value.as_ref().and_then(|v| v.usd)
    }
}
