//! Payload sanitization.
//!
//! Turns raw source payloads into canonical records. Unlike a validator that
//! rejects bad quotes, the sanitizer repairs them field by field:
//! - Missing, NaN, infinite or non-positive prices fall back to the last known
//!   good value, then to a configured default
//! - 24h high/low are derived from the price when missing (`1.02` / `0.98`)
//!   and swapped when inverted
//! - Market cap is estimated from circulating supply when missing
//! - History rows are normalized to `[ms, price]`, filtered, sorted and
//!   deduplicated
//!
//! Every repair is reported as a [`ValidationIssue`] and logged.

use std::collections::BTreeMap;

use log::warn;

use crate::config::FallbackBounds;
use crate::models::{
    HistoricalSeries, MarketSnapshot, PricePoint, PriceRecord, RawHistory, RawMarket, RawPrice,
};

/// Multiplier for a derived 24h high.
pub const DERIVED_HIGH_FACTOR: f64 = 1.02;

/// Multiplier for a derived 24h low.
pub const DERIVED_LOW_FACTOR: f64 = 0.98;

/// Timestamps below this are taken to be unix seconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// How serious a validation finding is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// The payload is unusable as a whole.
    Hard,
    /// A field was replaced; the record is still used.
    Soft,
}

/// One finding of the sanitizer.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn soft(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Soft,
            field,
            message: message.into(),
        }
    }

    fn hard(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Hard,
            field,
            message: message.into(),
        }
    }
}

/// A canonical value plus what had to be repaired to get it.
#[derive(Clone, Debug)]
pub struct Sanitized<T> {
    pub value: T,
    pub issues: Vec<ValidationIssue>,
}

impl<T> Sanitized<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_hard_issue(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == ValidationSeverity::Hard)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Normalize a raw timestamp to unix milliseconds.
fn timestamp_ms(raw: f64) -> Option<i64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let ms = if raw < MILLIS_THRESHOLD { raw * 1000.0 } else { raw };
    Some(ms as i64)
}

/// Normalize a raw timestamp to unix seconds; providers sometimes send ms.
fn timestamp_secs(raw: Option<i64>, now_unix: i64) -> (i64, bool) {
    match raw {
        Some(ts) if ts > 0 && (ts as f64) >= MILLIS_THRESHOLD => (ts / 1000, true),
        Some(ts) if ts > 0 => (ts, true),
        _ => (now_unix, false),
    }
}

/// Product of a price and a supply, or `None` when it overflows.
fn capitalization(price: f64, supply: f64) -> Option<f64> {
    Some(price * supply).filter(|cap| cap.is_finite())
}

/// Derive 24h high/low from the price where missing, keeping high >= low.
fn high_low(
    price: f64,
    high: Option<f64>,
    low: Option<f64>,
    max_price: f64,
    issues: &mut Vec<ValidationIssue>,
) -> (f64, f64) {
    let plausible = |v: Option<f64>| positive(v).filter(|v| *v <= max_price);
    let high = plausible(high).unwrap_or_else(|| {
        issues.push(ValidationIssue::soft("high_24h", "derived from price"));
        price * DERIVED_HIGH_FACTOR
    });
    let low = plausible(low).unwrap_or_else(|| {
        issues.push(ValidationIssue::soft("low_24h", "derived from price"));
        price * DERIVED_LOW_FACTOR
    });

    if high < low {
        issues.push(ValidationIssue::soft("high_24h", "high below low, swapped"));
        (low, high)
    } else {
        (high, low)
    }
}

/// Sanitizer for source payloads.
#[derive(Clone, Debug, Default)]
pub struct Sanitizer {
    bounds: FallbackBounds,
}

impl Sanitizer {
    pub fn new(bounds: FallbackBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &FallbackBounds {
        &self.bounds
    }

    fn plausible_price(&self, value: Option<f64>) -> Option<f64> {
        positive(value).filter(|v| *v <= self.bounds.max_price)
    }

    /// Build a canonical price record.
    ///
    /// `last_known` is the most recent real record, used before the defaults.
    /// A replaced `usd` is a hard issue: the record is well-formed but not
    /// something the source actually quoted.
    pub fn price(
        &self,
        source: &str,
        raw: &RawPrice,
        last_known: Option<&PriceRecord>,
        now_unix: i64,
    ) -> Sanitized<PriceRecord> {
        let mut issues = Vec::new();

        let usd = self.plausible_price(raw.usd).unwrap_or_else(|| {
            issues.push(ValidationIssue::hard("usd", format!("invalid value {:?}", raw.usd)));
            last_known
                .and_then(|last| self.plausible_price(Some(last.usd)))
                .unwrap_or(self.bounds.default_price)
        });

        let usd_24h_change = finite(raw.change_24h).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft("usd_24h_change", "missing, set to 0"));
            0.0
        });

        let usd_24h_vol = positive(raw.volume_24h).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft("usd_24h_vol", "missing or not positive"));
            last_known
                .and_then(|last| positive(Some(last.usd_24h_vol)))
                .unwrap_or(self.bounds.default_volume)
        });

        let usd_market_cap = positive(raw.market_cap).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft(
                "usd_market_cap",
                "estimated from circulating supply",
            ));
            capitalization(usd, self.bounds.circulating_supply).unwrap_or(0.0)
        });

        let (high, low) = high_low(
            usd,
            raw.high_24h,
            raw.low_24h,
            self.bounds.max_price,
            &mut issues,
        );

        let (last_updated_at, had_timestamp) = timestamp_secs(raw.last_updated_at, now_unix);
        if !had_timestamp {
            issues.push(ValidationIssue::soft("last_updated_at", "missing, set to now"));
        }

        let sanitized = Sanitized {
            value: PriceRecord {
                usd,
                usd_24h_change,
                usd_24h_vol,
                usd_market_cap,
                usd_24h_high: Some(high),
                usd_24h_low: Some(low),
                last_updated_at,
            },
            issues,
        };
        Self::log_issues(source, "price", &sanitized);
        sanitized
    }

    /// Build a canonical historical series.
    ///
    /// Malformed rows are dropped; an empty result carries a hard issue and
    /// is left to the caller to replace.
    pub fn history(&self, source: &str, raw: &RawHistory) -> Sanitized<HistoricalSeries> {
        let mut issues = Vec::new();
        let mut by_timestamp = BTreeMap::new();
        let mut dropped = 0usize;

        for point in &raw.points {
            let ts = point.timestamp.and_then(timestamp_ms);
            let price = self.plausible_price(point.price);
            match (ts, price) {
                // Later rows win on duplicate timestamps.
                (Some(ts), Some(price)) => {
                    by_timestamp.insert(ts, price);
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            issues.push(ValidationIssue::soft(
                "prices",
                format!("dropped {} of {} rows", dropped, raw.points.len()),
            ));
        }

        let prices: Vec<PricePoint> = by_timestamp
            .into_iter()
            .map(|(ts, price)| PricePoint(ts, price))
            .collect();

        if prices.is_empty() {
            issues.push(ValidationIssue::hard("prices", "no usable rows"));
        }

        let sanitized = Sanitized {
            value: HistoricalSeries::new(prices),
            issues,
        };
        Self::log_issues(source, "history", &sanitized);
        sanitized
    }

    /// Build a canonical market snapshot. Like [`Sanitizer::price`], a
    /// replaced `current_price` is a hard issue.
    pub fn market(
        &self,
        source: &str,
        raw: &RawMarket,
        last_known: Option<&MarketSnapshot>,
        now_unix: i64,
    ) -> Sanitized<MarketSnapshot> {
        let mut issues = Vec::new();

        let current_price = self.plausible_price(raw.current_price).unwrap_or_else(|| {
            issues.push(ValidationIssue::hard(
                "current_price",
                format!("invalid value {:?}", raw.current_price),
            ));
            last_known
                .and_then(|last| self.plausible_price(Some(last.current_price)))
                .unwrap_or(self.bounds.default_price)
        });

        let total_volume = positive(raw.total_volume).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft("total_volume", "missing or not positive"));
            last_known
                .and_then(|last| positive(Some(last.total_volume)))
                .unwrap_or(self.bounds.default_volume)
        });

        let circulating_supply = positive(raw.circulating_supply).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft("circulating_supply", "default used"));
            self.bounds.circulating_supply
        });

        let market_cap = positive(raw.market_cap).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft(
                "market_cap",
                "estimated from circulating supply",
            ));
            capitalization(current_price, circulating_supply)
                .or_else(|| capitalization(current_price, self.bounds.circulating_supply))
                .unwrap_or(0.0)
        });

        let price_change_24h = finite(raw.price_change_24h).unwrap_or_else(|| {
            issues.push(ValidationIssue::soft("price_change_24h", "missing, set to 0"));
            0.0
        });

        let price_change_percentage_24h =
            finite(raw.price_change_percentage_24h).unwrap_or_else(|| {
                issues.push(ValidationIssue::soft(
                    "price_change_percentage_24h",
                    "missing, set to 0",
                ));
                0.0
            });

        let (high_24h, low_24h) = high_low(
            current_price,
            raw.high_24h,
            raw.low_24h,
            self.bounds.max_price,
            &mut issues,
        );

        let (last_updated_at, had_timestamp) = timestamp_secs(raw.last_updated_at, now_unix);
        if !had_timestamp {
            issues.push(ValidationIssue::soft("last_updated_at", "missing, set to now"));
        }

        let sanitized = Sanitized {
            value: MarketSnapshot {
                current_price,
                market_cap,
                total_volume,
                price_change_24h,
                price_change_percentage_24h,
                high_24h,
                low_24h,
                circulating_supply,
                total_supply: positive(raw.total_supply),
                market_cap_rank: raw.market_cap_rank,
                last_updated_at,
            },
            issues,
        };
        Self::log_issues(source, "market", &sanitized);
        sanitized
    }

    fn log_issues<T>(source: &str, kind: &str, sanitized: &Sanitized<T>) {
        if sanitized.is_clean() {
            return;
        }
        let summary: Vec<String> = sanitized
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect();
        warn!(
            "Sanitized {} payload from '{}': {}",
            kind,
            source,
            summary.join("; ")
        );
    }
}
