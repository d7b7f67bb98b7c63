use serde::{Deserialize, Serialize};

/// One `[timestamp_ms, price]` sample of a canonical series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(pub i64, pub f64);

impl PricePoint {
    pub fn timestamp(&self) -> i64 {
        self.0
    }

    pub fn price(&self) -> f64 {
        self.1
    }
}

/// Canonical historical series: ascending by timestamp, unique timestamps,
/// finite and strictly positive prices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub prices: Vec<PricePoint>,
}

impl HistoricalSeries {
    pub fn new(prices: Vec<PricePoint>) -> Self {
        Self { prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.prices.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.prices.last()
    }

    /// True when the series satisfies the ordering and value invariants.
    pub fn is_well_formed(&self) -> bool {
        self.prices.iter().all(|p| p.1.is_finite() && p.1 > 0.0)
            && self.prices.windows(2).all(|w| w[0].0 < w[1].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_serialize_as_tuples() {
        let series = HistoricalSeries::new(vec![PricePoint(1_000, 1.2), PricePoint(2_000, 1.3)]);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"prices":[[1000,1.2],[2000,1.3]]}"#);
    }

    #[test]
    fn test_well_formed_requires_strict_ordering() {
        let ordered = HistoricalSeries::new(vec![PricePoint(1, 1.0), PricePoint(2, 1.1)]);
        let duplicated = HistoricalSeries::new(vec![PricePoint(1, 1.0), PricePoint(1, 1.1)]);
        let negative = HistoricalSeries::new(vec![PricePoint(1, -1.0)]);

        assert!(ordered.is_well_formed());
        assert!(!duplicated.is_well_formed());
        assert!(!negative.is_well_formed());
    }
}
