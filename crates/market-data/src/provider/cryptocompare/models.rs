//! CryptoCompare API response models.
//!
//! CryptoCompare reports errors in-band: HTTP 200 with `"Response": "Error"`.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::provider::http::{lenient_f64, lenient_i64};

/// Response of `/data/pricemultifull`, `RAW[fsym][tsym]`.
#[derive(Debug, Deserialize)]
pub struct PriceMultiFullResponse {
    #[serde(rename = "RAW", default)]
    pub raw: HashMap<String, HashMap<String, RawQuote>>,
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
}

/// One `RAW.XRP.USD` quote block.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct RawQuote {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(rename = "CHANGE24HOUR", default, deserialize_with = "lenient_f64")]
    pub change_24hour: Option<f64>,
    #[serde(rename = "CHANGEPCT24HOUR", default, deserialize_with = "lenient_f64")]
    pub change_pct_24hour: Option<f64>,
    /// 24h volume in the quote currency.
    #[serde(rename = "VOLUME24HOURTO", default, deserialize_with = "lenient_f64")]
    pub volume_24hour_to: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mktcap: Option<f64>,
    #[serde(rename = "HIGH24HOUR", default, deserialize_with = "lenient_f64")]
    pub high_24hour: Option<f64>,
    #[serde(rename = "LOW24HOUR", default, deserialize_with = "lenient_f64")]
    pub low_24hour: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub circulatingsupply: Option<f64>,
    /// Unix seconds
    #[serde(default, deserialize_with = "lenient_i64")]
    pub lastupdate: Option<i64>,
}

/// Response of `/data/v2/histohour` and `/data/v2/histoday`.
#[derive(Debug, Deserialize)]
pub struct HistoResponse {
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "Data")]
    pub data: Option<HistoData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoData {
    /// `{"time": unix_secs, "close": price, ...}` rows.
    #[serde(rename = "Data", default)]
    pub data: Vec<Value>,
}

/// True when the body is an in-band error report.
pub fn is_error_response(response: &Option<String>) -> bool {
    response.as_deref() == Some("Error")
}
