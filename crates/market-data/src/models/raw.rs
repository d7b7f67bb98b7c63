//! Pre-validation payloads produced by source adapters.
//!
//! Adapters map provider schemas into these loose shapes; numeric fields may be
//! missing, NaN or out of range. The sanitizer turns them into canonical records.
//! Nothing in here is ever handed to callers.

use serde_json::Value;

/// Current price as reported by a source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPrice {
    pub usd: Option<f64>,
    pub change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub last_updated_at: Option<i64>,
}

/// A single history sample before filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawPricePoint {
    pub timestamp: Option<f64>,
    pub price: Option<f64>,
}

impl RawPricePoint {
    pub fn new(timestamp: f64, price: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            price: Some(price),
        }
    }

    /// Read a sample from any of the shapes upstream APIs use:
    /// `[ts, price]`, `{"timestamp": ts, "price": p}`, `{"time": ts, "close": p}`.
    /// Anything else yields an empty sample that validation drops.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                timestamp: items.first().and_then(json_number),
                price: items.get(1).and_then(json_number),
            },
            Value::Object(map) => {
                let pick = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(json_number));
                Self {
                    timestamp: pick(&["timestamp", "time", "t", "date"]),
                    price: pick(&["price", "close", "c", "value"]),
                }
            }
            _ => Self::default(),
        }
    }
}

/// Historical samples as reported by a source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawHistory {
    pub points: Vec<RawPricePoint>,
}

impl RawHistory {
    pub fn new(points: Vec<RawPricePoint>) -> Self {
        Self { points }
    }

    pub fn from_json_entries<'a>(entries: impl IntoIterator<Item = &'a Value>) -> Self {
        Self {
            points: entries.into_iter().map(RawPricePoint::from_json).collect(),
        }
    }
}

/// Market snapshot as reported by a source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMarket {
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub last_updated_at: Option<i64>,
}

/// Numeric value of a JSON number or numeric string ("2.85").
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
