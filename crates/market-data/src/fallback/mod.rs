//! Synthetic data for degraded mode.
//!
//! When every source fails, the service still returns schema-valid records
//! built here. Generators are pure: no I/O and no shared state. The same seed
//! and inputs always give the same output. Prices stay within
//! `base * (1 ± max_deviation)` of the base price.
//!
//! Everything produced here is wrapped in `Acquired::Synthetic` by the caller.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::FallbackBounds;
use crate::models::{HistoricalSeries, HistoryPeriod, MarketSnapshot, PricePoint, PriceRecord};
use crate::registry::{DERIVED_HIGH_FACTOR, DERIVED_LOW_FACTOR};

/// Largest 24h change a synthetic price carries, in percent.
const MAX_SYNTHETIC_CHANGE_PCT: f64 = 5.0;

/// Largest step of the synthetic random walk, as a fraction of the price.
const MAX_STEP: f64 = 0.02;

const DAY_MS: i64 = 86_400_000;

/// Generator of synthetic records within configured bounds.
#[derive(Clone, Debug, Default)]
pub struct FallbackSynthesizer {
    bounds: FallbackBounds,
}

impl FallbackSynthesizer {
    pub fn new(bounds: FallbackBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &FallbackBounds {
        &self.bounds
    }

    /// Base price to build around: `base` when valid, the default otherwise.
    fn base_price(&self, base: Option<f64>) -> f64 {
        base.filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(self.bounds.default_price)
    }

    /// Price band `(low, high)` around a base.
    fn band(&self, base: f64) -> (f64, f64) {
        let deviation = self.bounds.max_deviation.clamp(0.0, 0.9);
        (base * (1.0 - deviation), base * (1.0 + deviation))
    }

    /// Synthetic current price.
    pub fn price(&self, base: Option<f64>, now_unix: i64, seed: u64) -> PriceRecord {
        let mut rng = StdRng::seed_from_u64(seed);
        let base = self.base_price(base);
        let (low, high) = self.band(base);

        let change = rng.gen_range(-MAX_SYNTHETIC_CHANGE_PCT..=MAX_SYNTHETIC_CHANGE_PCT);
        let usd = (base * (1.0 + change / 100.0)).clamp(low, high);
        let volume = self.bounds.default_volume * rng.gen_range(0.8..=1.2);

        PriceRecord {
            usd,
            usd_24h_change: change,
            usd_24h_vol: volume,
            usd_market_cap: usd * self.bounds.circulating_supply,
            usd_24h_high: Some(usd * DERIVED_HIGH_FACTOR),
            usd_24h_low: Some(usd * DERIVED_LOW_FACTOR),
            last_updated_at: now_unix,
        }
    }

    /// Synthetic series covering `period` and ending at `now_ms`.
    ///
    /// Points are evenly spaced and the walk ends near the base price.
    pub fn history(
        &self,
        period: HistoryPeriod,
        base: Option<f64>,
        now_ms: i64,
        seed: u64,
    ) -> HistoricalSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let base = self.base_price(base);
        let (low, high) = self.band(base);

        let points = period.synthetic_points().max(1);
        let step_ms = (i64::from(period.days()) * DAY_MS / points as i64).max(1);

        // Walk backwards from the base so the latest point matches it.
        let mut prices = Vec::with_capacity(points);
        let mut price = base;
        for i in 0..points {
            let timestamp = now_ms - i as i64 * step_ms;
            prices.push(PricePoint(timestamp, price));
            price = (price * (1.0 + rng.gen_range(-MAX_STEP..=MAX_STEP))).clamp(low, high);
        }
        prices.reverse();

        HistoricalSeries::new(prices)
    }

    /// Synthetic market snapshot.
    pub fn market(&self, base: Option<f64>, now_unix: i64, seed: u64) -> MarketSnapshot {
        let record = self.price(base, now_unix, seed);
        let previous = record.usd / (1.0 + record.usd_24h_change / 100.0);

        MarketSnapshot {
            current_price: record.usd,
            market_cap: record.usd_market_cap,
            total_volume: record.usd_24h_vol,
            price_change_24h: record.usd - previous,
            price_change_percentage_24h: record.usd_24h_change,
            high_24h: record.usd * DERIVED_HIGH_FACTOR,
            low_24h: record.usd * DERIVED_LOW_FACTOR,
            circulating_supply: self.bounds.circulating_supply,
            total_supply: Some(self.bounds.total_supply),
            market_cap_rank: None,
            last_updated_at: now_unix,
        }
    }
}
