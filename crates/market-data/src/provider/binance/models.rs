//! Binance spot API response models.
//!
//! Binance sends most numbers as strings; every numeric field goes through
//! the lenient deserializers.

use serde::Deserialize;
use serde_json::Value;

use crate::provider::http::{lenient_f64, lenient_i64};

/// Response of `/api/v3/ticker/24hr?symbol=...`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hr {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low_price: Option<f64>,
    /// Volume in quote asset (USDT), used as USD volume.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quote_volume: Option<f64>,
    /// Close time of the rolling window in milliseconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub close_time: Option<i64>,
}

/// One kline row: `[open_time, open, high, low, close, volume, close_time, ...]`.
pub type KlineRow = Vec<Value>;

/// Index of the open time in a kline row.
pub const KLINE_OPEN_TIME: usize = 0;

/// Index of the close price in a kline row.
pub const KLINE_CLOSE: usize = 4;
