use std::fmt;

use serde::Serialize;

use super::acquired::Acquired;
use super::history::HistoricalSeries;
use super::market::MarketSnapshot;
use super::price::PriceRecord;

/// Part of a batch an error refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorKind {
    Current,
    Historical,
    Market,
    Critical,
}

impl BatchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Historical => "historical",
            Self::Market => "market",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for BatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band error attached to a batch result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchError {
    #[serde(rename = "type")]
    pub kind: BatchErrorKind,
    pub error: String,
}

impl BatchError {
    pub fn new(kind: BatchErrorKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
        }
    }
}

/// Combined result of one polling round.
///
/// Always structurally complete: every part holds schema-valid data, real or
/// synthetic. `success` is true only when `current` came from a source.
#[derive(Clone, Debug, Serialize)]
pub struct BatchData {
    pub current: Acquired<PriceRecord>,
    pub historical: Acquired<HistoricalSeries>,
    pub market: Acquired<MarketSnapshot>,
    pub success: bool,
    pub errors: Vec<BatchError>,
}

impl BatchData {
    /// Combine three independently acquired parts.
    ///
    /// Every synthetic part contributes one error naming its degraded reason.
    pub fn assemble(
        current: Acquired<PriceRecord>,
        historical: Acquired<HistoricalSeries>,
        market: Acquired<MarketSnapshot>,
    ) -> Self {
        let errors = [
            (BatchErrorKind::Current, current.reason()),
            (BatchErrorKind::Historical, historical.reason()),
            (BatchErrorKind::Market, market.reason()),
        ]
        .into_iter()
        .filter_map(|(kind, reason)| reason.map(|r| BatchError::new(kind, r.to_string())))
        .collect();

        Self {
            success: current.is_real(),
            current,
            historical,
            market,
            errors,
        }
    }
}
