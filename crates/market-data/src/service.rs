//! Market data service.
//!
//! The single entry point of the acquisition layer. A service owns all
//! mutable state (quota windows, source health, cache, last known records),
//! is built once at startup and shared by `Arc`.
//!
//! None of the fetch operations fail: when every source is exhausted the
//! caller receives synthetic data tagged as [`Acquired::Synthetic`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::MarketDataConfig;
use crate::fallback::FallbackSynthesizer;
use crate::models::{
    Acquired, BatchData, BatchError, BatchErrorKind, DegradedReason, HistoricalSeries,
    HistoryPeriod, MarketSnapshot, PriceRecord,
};
use crate::provider::binance::BinanceSource;
use crate::provider::coingecko::CoinGeckoSource;
use crate::provider::cryptocompare::CryptoCompareSource;
use crate::provider::MarketDataSource;
use crate::registry::{
    CacheStats, HealthTracker, HistoryRequest, MarketRequest, PriceRequest, ResponseCache,
    Sanitizer, SourceHealth, SourceRegistry,
};

/// Asset part of every cache key.
const ASSET_KEY: &str = "xrp";

/// Multi-source market data service for XRP.
pub struct MarketDataService {
    config: MarketDataConfig,
    registry: SourceRegistry,
    cache: Arc<ResponseCache>,
    sanitizer: Sanitizer,
    synthesizer: FallbackSynthesizer,
    clock: Arc<dyn Clock>,
    last_price: Mutex<Option<PriceRecord>>,
    last_market: Mutex<Option<MarketSnapshot>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl MarketDataService {
    /// Build the service with the CoinGecko, Binance and CryptoCompare sources
    /// enabled in `config`.
    pub fn new(config: MarketDataConfig) -> Self {
        let symbols = &config.xrp_symbols;
        let sources_config = &config.sources;
        let timeout = config.timeout;

        let mut sources: Vec<Arc<dyn MarketDataSource>> = Vec::new();
        if sources_config.coingecko.enabled {
            sources.push(Arc::new(CoinGeckoSource::new(
                &sources_config.coingecko,
                &symbols.coingecko,
                timeout,
            )));
        }
        if sources_config.binance.enabled {
            sources.push(Arc::new(BinanceSource::new(
                &sources_config.binance,
                &symbols.binance,
                timeout,
            )));
        }
        if sources_config.cryptocompare.enabled {
            sources.push(Arc::new(CryptoCompareSource::new(
                &sources_config.cryptocompare,
                &symbols.cryptocompare,
                timeout,
            )));
        }

        Self::with_sources(sources, config, Arc::new(SystemClock))
    }

    /// Build the service around arbitrary sources and clock.
    pub fn with_sources(
        sources: Vec<Arc<dyn MarketDataSource>>,
        config: MarketDataConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let health = HealthTracker::new(config.backoff_policy(), clock.clone());
        let registry = SourceRegistry::new(sources, health);
        let cache = Arc::new(ResponseCache::new(config.cache.clone(), clock.clone()));

        info!(
            "Market data service configured with sources: {}",
            registry
                .sources()
                .iter()
                .map(|s| s.id().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            sanitizer: Sanitizer::new(config.fallback.clone()),
            synthesizer: FallbackSynthesizer::new(config.fallback.clone()),
            config,
            registry,
            cache,
            clock,
            last_price: Mutex::new(None),
            last_market: Mutex::new(None),
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    /// Start background work (the periodic cache sweep).
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// the sweep is running does nothing.
    pub fn init(&self) {
        let mut sweeper = lock(&self.sweeper);
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Market data service already initialized");
            return;
        }

        let cache = self.cache.clone();
        let period = self.config.cache.sweep_interval;
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    debug!("Cache sweep removed {} entries", removed);
                }
            }
        }));

        info!("Market data service started (sweep every {:?})", period);
    }

    /// Stop background work and drop cached data.
    pub fn dispose(&self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
        self.cache.clear();
        info!("Market data service disposed");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.sweeper)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Health metrics of every source that has been called.
    pub fn source_health(&self) -> Vec<SourceHealth> {
        self.registry.health().snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn seed(&self) -> u64 {
        self.clock.unix_now().unsigned_abs()
    }

    /// Most recent real price, from either the price or the market feed.
    fn last_known_usd(&self) -> Option<f64> {
        lock(&self.last_price)
            .as_ref()
            .map(|p| p.usd)
            .or_else(|| lock(&self.last_market).as_ref().map(|m| m.current_price))
    }

    fn price_key() -> String {
        format!("price:{}", ASSET_KEY)
    }

    fn historical_key(period: HistoryPeriod) -> String {
        format!("historical:{}:{}", ASSET_KEY, period.days())
    }

    fn market_key() -> String {
        format!("market:{}", ASSET_KEY)
    }

    /// Current price with 24h statistics.
    pub async fn get_current_price(&self) -> Acquired<PriceRecord> {
        let key = Self::price_key();
        if let Some((record, source)) = self.cache.get::<PriceRecord>(&key) {
            debug!("Price served from cache ({})", source);
            return Acquired::real(record, source);
        }

        match self.registry.fetch(&PriceRequest).await {
            Ok(fetched) => {
                let last = lock(&self.last_price).clone();
                let sanitized = self.sanitizer.price(
                    &fetched.source,
                    &fetched.data,
                    last.as_ref(),
                    self.clock.unix_now(),
                );
                if sanitized.has_hard_issue() {
                    let reason = DegradedReason::NoValidData(format!(
                        "{} sent no usable price",
                        fetched.source
                    ));
                    warn!("Using repaired price: {}", reason);
                    return Acquired::synthetic(sanitized.value, reason);
                }

                let record = sanitized.value;
                *lock(&self.last_price) = Some(record.clone());
                self.cache.set(&key, record.clone(), fetched.source.clone());
                Acquired::real(record, fetched.source)
            }
            Err(e) => {
                warn!("Using synthetic price: {}", e);
                let record =
                    self.synthesizer
                        .price(self.last_known_usd(), self.clock.unix_now(), self.seed());
                Acquired::synthetic(record, DegradedReason::SourcesExhausted(e.to_string()))
            }
        }
    }

    /// Price history covering `period`.
    pub async fn get_historical_data(&self, period: HistoryPeriod) -> Acquired<HistoricalSeries> {
        let key = Self::historical_key(period);
        if let Some((series, source)) = self.cache.get::<HistoricalSeries>(&key) {
            debug!("History ({} days) served from cache ({})", period, source);
            return Acquired::real(series, source);
        }

        let reason = match self.registry.fetch(&HistoryRequest(period)).await {
            Ok(fetched) => {
                let sanitized = self.sanitizer.history(&fetched.source, &fetched.data);
                if !sanitized.has_hard_issue() {
                    let series = sanitized.value;
                    self.cache.set(&key, series.clone(), fetched.source.clone());
                    return Acquired::real(series, fetched.source);
                }
                DegradedReason::NoValidData(format!(
                    "{} returned no usable history rows",
                    fetched.source
                ))
            }
            Err(e) => DegradedReason::SourcesExhausted(e.to_string()),
        };

        warn!("Using synthetic history ({} days): {}", period, reason);
        let now_ms = self.clock.unix_now() * 1000;
        let series =
            self.synthesizer
                .history(period, self.last_known_usd(), now_ms, self.seed());
        Acquired::synthetic(series, reason)
    }

    /// Market snapshot (cap, volume, supply, 24h range).
    pub async fn get_market_data(&self) -> Acquired<MarketSnapshot> {
        let key = Self::market_key();
        if let Some((snapshot, source)) = self.cache.get::<MarketSnapshot>(&key) {
            debug!("Market served from cache ({})", source);
            return Acquired::real(snapshot, source);
        }

        match self.registry.fetch(&MarketRequest).await {
            Ok(fetched) => {
                let last = lock(&self.last_market).clone();
                let sanitized = self.sanitizer.market(
                    &fetched.source,
                    &fetched.data,
                    last.as_ref(),
                    self.clock.unix_now(),
                );
                if sanitized.has_hard_issue() {
                    let reason = DegradedReason::NoValidData(format!(
                        "{} sent no usable price",
                        fetched.source
                    ));
                    warn!("Using repaired market data: {}", reason);
                    return Acquired::synthetic(sanitized.value, reason);
                }

                let snapshot = sanitized.value;
                *lock(&self.last_market) = Some(snapshot.clone());
                self.cache
                    .set(&key, snapshot.clone(), fetched.source.clone());
                Acquired::real(snapshot, fetched.source)
            }
            Err(e) => {
                warn!("Using synthetic market data: {}", e);
                let snapshot =
                    self.synthesizer
                        .market(self.last_known_usd(), self.clock.unix_now(), self.seed());
                Acquired::synthetic(snapshot, DegradedReason::SourcesExhausted(e.to_string()))
            }
        }
    }

    /// Fetch price, history and market data concurrently.
    ///
    /// Each part degrades independently. A panic while assembling the batch
    /// turns the whole result synthetic with a single `critical` error.
    pub async fn get_batch_data(&self, period: HistoryPeriod) -> BatchData {
        let assembled = AssertUnwindSafe(async {
            let (current, historical, market) = futures::join!(
                self.get_current_price(),
                self.get_historical_data(period),
                self.get_market_data(),
            );
            BatchData::assemble(current, historical, market)
        })
        .catch_unwind()
        .await;

        match assembled {
            Ok(batch) => {
                debug!(
                    "Batch assembled: success={}, {} errors",
                    batch.success,
                    batch.errors.len()
                );
                batch
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Batch assembly panicked: {}", message);
                self.critical_batch(period, message)
            }
        }
    }

    fn critical_batch(&self, period: HistoryPeriod, message: String) -> BatchData {
        let now = self.clock.unix_now();
        let base = self.last_known_usd();
        let seed = self.seed();
        let reason = DegradedReason::Critical(message.clone());

        BatchData {
            current: Acquired::synthetic(self.synthesizer.price(base, now, seed), reason.clone()),
            historical: Acquired::synthetic(
                self.synthesizer.history(period, base, now * 1000, seed),
                reason.clone(),
            ),
            market: Acquired::synthetic(self.synthesizer.market(base, now, seed), reason),
            success: false,
            errors: vec![BatchError::new(BatchErrorKind::Critical, message)],
        }
    }
}

impl Drop for MarketDataService {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
    }
}
