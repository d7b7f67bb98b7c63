use serde::{Deserialize, Serialize};

/// Canonical current-price record.
///
/// Every source is mapped into this shape before it is cached or returned.
/// Numeric fields are always finite: `usd > 0`, volume and market cap `>= 0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Spot price in USD
    pub usd: f64,

    /// 24h change in percent
    pub usd_24h_change: f64,

    /// 24h traded volume in USD
    pub usd_24h_vol: f64,

    /// Market capitalization in USD
    pub usd_market_cap: f64,

    /// 24h high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_24h_high: Option<f64>,

    /// 24h low
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_24h_low: Option<f64>,

    /// Unix seconds of the upstream update
    pub last_updated_at: i64,
}

impl PriceRecord {
    /// Create a record with only the price set; statistics default to zero.
    pub fn new(usd: f64, last_updated_at: i64) -> Self {
        Self {
            usd,
            usd_24h_change: 0.0,
            usd_24h_vol: 0.0,
            usd_market_cap: 0.0,
            usd_24h_high: None,
            usd_24h_low: None,
            last_updated_at,
        }
    }

    /// True when every numeric field satisfies the canonical invariants.
    pub fn is_well_formed(&self) -> bool {
        let optional_ok = |v: Option<f64>| v.map_or(true, |v| v.is_finite() && v > 0.0);

        self.usd.is_finite()
            && self.usd > 0.0
            && self.usd_24h_change.is_finite()
            && self.usd_24h_vol.is_finite()
            && self.usd_24h_vol >= 0.0
            && self.usd_market_cap.is_finite()
            && self.usd_market_cap >= 0.0
            && optional_ok(self.usd_24h_high)
            && optional_ok(self.usd_24h_low)
    }
}
