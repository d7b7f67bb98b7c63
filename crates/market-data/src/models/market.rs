use serde::{Deserialize, Serialize};

/// Canonical market snapshot for the tracked asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Spot price in USD
    pub current_price: f64,

    /// Market capitalization in USD
    pub market_cap: f64,

    /// 24h traded volume in USD
    pub total_volume: f64,

    /// Absolute 24h price change in USD
    pub price_change_24h: f64,

    /// 24h price change in percent
    pub price_change_percentage_24h: f64,

    pub high_24h: f64,

    pub low_24h: f64,

    /// Circulating supply in units of the asset
    pub circulating_supply: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,

    /// Unix seconds of the upstream update
    pub last_updated_at: i64,
}

impl MarketSnapshot {
    /// True when every numeric field satisfies the canonical invariants.
    pub fn is_well_formed(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        positive(self.current_price)
            && positive(self.high_24h)
            && positive(self.low_24h)
            && self.high_24h >= self.low_24h
            && non_negative(self.market_cap)
            && non_negative(self.total_volume)
            && non_negative(self.circulating_supply)
            && self.price_change_24h.is_finite()
            && self.price_change_percentage_24h.is_finite()
            && self.total_supply.map_or(true, non_negative)
    }
}
