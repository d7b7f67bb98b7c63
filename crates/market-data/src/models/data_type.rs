//! Logical data types served by the acquisition layer and history periods.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Kind of data a request asks for. Each kind has its own cache TTL.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Current price with 24h statistics.
    Price,
    /// Historical price series.
    Historical,
    /// Market snapshot (caps, supplies, ranges).
    Market,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Historical => "historical",
            Self::Market => "market",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookback window for historical series.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HistoryPeriod {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl HistoryPeriod {
    pub const ALL: [HistoryPeriod; 5] = [
        HistoryPeriod::Day,
        HistoryPeriod::Week,
        HistoryPeriod::Month,
        HistoryPeriod::Quarter,
        HistoryPeriod::Year,
    ];

    /// Number of days covered by this period.
    pub fn days(&self) -> u32 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// Number of points a synthetic series for this period carries.
    pub fn synthetic_points(&self) -> usize {
        match self {
            Self::Day => 24,
            Self::Week => 168,
            Self::Month => 180,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl FromStr for HistoryPeriod {
    type Err = MarketDataError;

    /// Accepts day counts ("7"), day suffixes ("7d") and a few aliases ("1y", "24h").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "1" | "1d" | "24h" | "day" => Ok(Self::Day),
            "7" | "7d" | "1w" | "week" => Ok(Self::Week),
            "30" | "30d" | "1m" | "month" => Ok(Self::Month),
            "90" | "90d" | "3m" | "quarter" => Ok(Self::Quarter),
            "365" | "365d" | "1y" | "year" => Ok(Self::Year),
            _ => Err(MarketDataError::InvalidPeriod(s.to_string())),
        }
    }
}

impl TryFrom<String> for HistoryPeriod {
    type Error = MarketDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HistoryPeriod> for String {
    fn from(period: HistoryPeriod) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_aliases() {
        assert_eq!("7".parse::<HistoryPeriod>().unwrap(), HistoryPeriod::Week);
        assert_eq!("30d".parse::<HistoryPeriod>().unwrap(), HistoryPeriod::Month);
        assert_eq!(" 1Y ".parse::<HistoryPeriod>().unwrap(), HistoryPeriod::Year);
        assert_eq!("24h".parse::<HistoryPeriod>().unwrap(), HistoryPeriod::Day);
    }

    #[test]
    fn test_parse_unknown_period_fails() {
        let err = "fortnight".parse::<HistoryPeriod>().unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidPeriod(ref p) if p == "fortnight"));
    }

    #[test]
    fn test_period_display_is_day_count() {
        for period in HistoryPeriod::ALL {
            assert_eq!(period.to_string(), period.days().to_string());
            assert_eq!(period.to_string().parse::<HistoryPeriod>().unwrap(), period);
        }
    }
}
