//! Static configuration of the acquisition layer.
//!
//! Field names follow the recognized options of the dashboard configuration
//! (`maxRetries`, `baseDelay`, `maxBackoff`, `timeout`, `xrpSymbols`) plus
//! per-source endpoints, cache TTLs and fallback bounds. Durations are
//! expressed in milliseconds when (de)serialized.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::BackoffPolicy;

/// Number of consecutive failures after which a source is taken out of rotation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff window.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(30);

/// Backoff cap.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Failures older than this are forgotten.
pub const DEFAULT_FAILURE_DECAY: Duration = Duration::from_secs(300);

/// Per-request HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketDataConfig {
    /// Consecutive failures before a source is unavailable during its backoff.
    pub max_retries: u32,

    #[serde(with = "duration_ms")]
    pub base_delay: Duration,

    #[serde(with = "duration_ms")]
    pub max_backoff: Duration,

    #[serde(with = "duration_ms")]
    pub failure_decay: Duration,

    #[serde(with = "duration_ms")]
    pub timeout: Duration,

    pub xrp_symbols: XrpSymbols,

    pub sources: SourcesConfig,

    pub cache: CacheConfig,

    pub fallback: FallbackBounds,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: DEFAULT_MAX_BACKOFF,
            failure_decay: DEFAULT_FAILURE_DECAY,
            timeout: DEFAULT_TIMEOUT,
            xrp_symbols: XrpSymbols::default(),
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            fallback: FallbackBounds::default(),
        }
    }
}

impl MarketDataConfig {
    /// Backoff parameters for the health tracker.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            failure_threshold: self.max_retries.max(1),
            base_delay: self.base_delay,
            max_backoff: self.max_backoff,
            failure_decay: self.failure_decay,
        }
    }
}

/// Symbol of XRP as known by each source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct XrpSymbols {
    pub coingecko: String,
    pub binance: String,
    pub cryptocompare: String,
}

impl Default for XrpSymbols {
    fn default() -> Self {
        Self {
            coingecko: "ripple".to_string(),
            binance: "XRPUSDT".to_string(),
            cryptocompare: "XRP".to_string(),
        }
    }
}

/// Endpoint and ordering settings of one source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSettings {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(rename = "baseURL", alias = "baseUrl")]
    pub base_url: String,
    #[serde(default, rename = "backupURL", alias = "backupUrl")]
    pub backup_url: Option<String>,
    /// Lower is tried first.
    pub priority: u8,
}

fn enabled_by_default() -> bool {
    true
}

impl SourceSettings {
    pub fn new(base_url: impl Into<String>, priority: u8) -> Self {
        Self {
            enabled: true,
            base_url: base_url.into(),
            backup_url: None,
            priority,
        }
    }

    pub fn with_backup(mut self, backup_url: impl Into<String>) -> Self {
        self.backup_url = Some(backup_url.into());
        self
    }
}

/// Settings of the three upstream sources.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub coingecko: SourceSettings,
    pub binance: SourceSettings,
    pub cryptocompare: SourceSettings,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            coingecko: SourceSettings::new("https://api.coingecko.com/api/v3", 1),
            binance: SourceSettings::new("https://api.binance.com", 2)
                .with_backup("https://api1.binance.com"),
            cryptocompare: SourceSettings::new("https://min-api.cryptocompare.com", 3),
        }
    }
}

/// Response cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(with = "duration_ms")]
    pub price_ttl: Duration,
    #[serde(with = "duration_ms")]
    pub historical_ttl: Duration,
    #[serde(with = "duration_ms")]
    pub market_ttl: Duration,
    /// How often expired entries are swept while the service is running.
    #[serde(with = "duration_ms")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price_ttl: Duration::from_secs(30),
            historical_ttl: Duration::from_secs(300),
            market_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Plausible values used when upstream data is missing or invalid.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallbackBounds {
    /// Price used when no valid or last-known price exists.
    pub default_price: f64,
    /// 24h volume used when no valid or last-known volume exists.
    pub default_volume: f64,
    /// Circulating supply used to estimate market cap.
    pub circulating_supply: f64,
    pub total_supply: f64,
    /// Synthetic prices stay within `base * (1 ± max_deviation)`.
    pub max_deviation: f64,
    /// Upstream prices above this are rejected as implausible.
    pub max_price: f64,
}

impl Default for FallbackBounds {
    fn default() -> Self {
        Self {
            default_price: 2.50,
            default_volume: 2_500_000_000.0,
            circulating_supply: 57_000_000_000.0,
            total_supply: 99_987_000_000.0,
            max_deviation: 0.2,
            max_price: 10_000.0,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backoff_contract() {
        let policy = MarketDataConfig::default().backoff_policy();
        assert_eq!(policy.failure_threshold, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(30));
        assert_eq!(policy.max_backoff, Duration::from_secs(120));
        assert_eq!(policy.failure_decay, Duration::from_secs(300));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MarketDataConfig = serde_json::from_str(
            r#"{
                "maxRetries": 5,
                "timeout": 15000,
                "xrpSymbols": { "binance": "XRPUSDC" },
                "sources": {
                    "coingecko": { "baseURL": "http://localhost:9000", "priority": 3 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_millis(15000));
        assert_eq!(config.base_delay, DEFAULT_BASE_DELAY);
        assert_eq!(config.xrp_symbols.binance, "XRPUSDC");
        assert_eq!(config.xrp_symbols.coingecko, "ripple");
        assert_eq!(config.sources.coingecko.base_url, "http://localhost:9000");
        assert!(config.sources.coingecko.enabled);
        assert_eq!(config.sources.binance.priority, 2);
    }

    #[test]
    fn test_ttls_order_price_before_historical() {
        let cache = CacheConfig::default();
        assert!(cache.price_ttl < cache.market_ttl);
        assert!(cache.market_ttl < cache.historical_ttl);
    }
}
