use std::time::Duration;

use tracing::{info, warn};
use xrpwatch_market_data::{HistoryPeriod, MarketDataConfig};

pub struct Config {
    pub poll_interval: Duration,
    pub history_period: HistoryPeriod,
    /// Print one batch as JSON and exit.
    pub once: bool,
    pub market_data: MarketDataConfig,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_var(key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

impl Config {
    /// Read `XW_*` variables. Expects `.env` to be loaded by the caller.
    pub fn from_env() -> Self {
        let history_period = match env_var("XW_HISTORY_PERIOD") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using 7 days", e);
                HistoryPeriod::Week
            }),
            None => HistoryPeriod::Week,
        };

        Self {
            poll_interval: Duration::from_secs(env_parse("XW_POLL_INTERVAL_SECS", 30u64).max(1)),
            history_period,
            once: env_flag("XW_ONCE", false),
            market_data: market_data_from_env(),
        }
    }
}

/// Base config from the JSON file in `XW_CONFIG_FILE`, or the defaults.
fn base_market_data() -> MarketDataConfig {
    let Some(path) = env_var("XW_CONFIG_FILE") else {
        return MarketDataConfig::default();
    };

    match std::fs::read_to_string(&path)
        .map_err(anyhow::Error::new)
        .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::new))
    {
        Ok(config) => {
            info!("Loaded market data config from {}", path);
            config
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path, e);
            MarketDataConfig::default()
        }
    }
}

fn market_data_from_env() -> MarketDataConfig {
    let mut config = base_market_data();

    config.max_retries = env_parse("XW_MAX_RETRIES", config.max_retries);
    config.timeout = Duration::from_millis(env_parse(
        "XW_REQUEST_TIMEOUT_MS",
        config.timeout.as_millis() as u64,
    ));
    config.base_delay = Duration::from_millis(env_parse(
        "XW_BACKOFF_BASE_MS",
        config.base_delay.as_millis() as u64,
    ));
    config.max_backoff = Duration::from_millis(env_parse(
        "XW_BACKOFF_MAX_MS",
        config.max_backoff.as_millis() as u64,
    ));
    config.cache.enabled = env_flag("XW_CACHE_ENABLED", config.cache.enabled);

    let sources = &mut config.sources;
    if let Some(url) = env_var("XW_COINGECKO_URL") {
        sources.coingecko.base_url = url;
    }
    if let Some(url) = env_var("XW_BINANCE_URL") {
        sources.binance.base_url = url;
    }
    if let Some(url) = env_var("XW_BINANCE_BACKUP_URL") {
        sources.binance.backup_url = Some(url);
    }
    if let Some(url) = env_var("XW_CRYPTOCOMPARE_URL") {
        sources.cryptocompare.base_url = url;
    }

    // Comma separated source names, e.g. "binance,cryptocompare"
    if let Some(disabled) = env_var("XW_DISABLED_SOURCES") {
        for name in disabled.split(',').map(|s| s.trim().to_ascii_lowercase()) {
            match name.as_str() {
                "coingecko" => sources.coingecko.enabled = false,
                "binance" => sources.binance.enabled = false,
                "cryptocompare" => sources.cryptocompare.enabled = false,
                "" => {}
                other => warn!("Unknown source in XW_DISABLED_SOURCES: {}", other),
            }
        }
    }

    config
}
