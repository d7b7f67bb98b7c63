use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use xrpwatch_market_data::MarketDataService;

use crate::config::Config;

/// Whether `XW_LOG_FORMAT` asks for JSON lines. Anything else is text.
pub fn json_log_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Install the global subscriber. Reads `RUST_LOG` and `XW_LOG_FORMAT`, so
/// `.env` must already be loaded.
pub fn init_tracing() {
    let log_format = std::env::var("XW_LOG_FORMAT").ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json_log_format(log_format.as_deref()) {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_service(config: &Config) -> Arc<MarketDataService> {
    let service = Arc::new(MarketDataService::new(config.market_data.clone()));
    service.init();
    tracing::info!(
        "Market data service ready (history period {} days, poll every {:?})",
        config.history_period.days(),
        config.poll_interval
    );
    service
}
