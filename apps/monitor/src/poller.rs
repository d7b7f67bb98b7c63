use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, info, warn};
use xrpwatch_market_data::{BatchData, HistoryPeriod, MarketDataService, SourceHealth};

/// Headline numbers of one polling round.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub price: f64,
    pub change_24h: f64,
    pub price_source: String,
    pub history_points: usize,
    pub market_cap: f64,
    pub degraded: bool,
    pub errors: Vec<String>,
}

impl PollSummary {
    pub fn from_batch(batch: &BatchData) -> Self {
        Self {
            price: batch.current.data().usd,
            change_24h: batch.current.data().usd_24h_change,
            price_source: batch.current.source().to_string(),
            history_points: batch.historical.data().len(),
            market_cap: batch.market.data().market_cap,
            degraded: !batch.success,
            errors: batch
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.kind, e.error))
                .collect(),
        }
    }
}

/// Runs one polling round and logs it.
pub async fn poll_once(service: &MarketDataService, period: HistoryPeriod) -> BatchData {
    let batch = service.get_batch_data(period).await;
    let summary = PollSummary::from_batch(&batch);
    debug!(
        "Poll summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );

    if summary.degraded {
        warn!(
            "XRP ${:.4} ({:+.2}%) from {} [degraded: {}]",
            summary.price,
            summary.change_24h,
            summary.price_source,
            summary.errors.join("; ")
        );
    } else {
        info!(
            "XRP ${:.4} ({:+.2}%) from {}, {} history points, market cap ${:.0}",
            summary.price,
            summary.change_24h,
            summary.price_source,
            summary.history_points,
            summary.market_cap
        );
    }

    log_health(&service.source_health());
    batch
}

fn log_health(health: &[SourceHealth]) {
    for source in health.iter().filter(|h| !h.available) {
        warn!(
            "Source {} in backoff for {}ms after {} failures (last error: {})",
            source.source,
            source.backoff_remaining_ms.unwrap_or(0),
            source.consecutive_failures,
            source.last_error.as_deref().unwrap_or("none")
        );
    }
}

/// Polls until ctrl-c.
pub async fn run(service: Arc<MarketDataService>, period: HistoryPeriod, every: Duration) {
    info!("Poller started ({:?} interval)", every);
    let mut ticker = interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&service, period).await;
                let stats = service.cache_stats();
                debug!(
                    "Cache: {} entries, hit rate {:.0}%",
                    stats.entries,
                    stats.hit_rate() * 100.0
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }
}
