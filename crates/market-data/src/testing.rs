//! Scriptable in-memory source for registry and service tests.

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{HistoryPeriod, RawHistory, RawMarket, RawPrice, RawPricePoint};
use crate::provider::{MarketDataSource, RateLimitPolicy, SourceDescriptor};

/// How a mock source answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Behavior {
    Ok,
    Timeout,
    RateLimited,
    /// Fails on the primary URL, answers on the backup.
    PrimaryDown,
    /// Has no market endpoint.
    NoMarket,
    Panic,
}

pub(crate) struct MockSource {
    descriptor: SourceDescriptor,
    behavior: Behavior,
    price: RawPrice,
    history: RawHistory,
    market: RawMarket,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(id: &'static str, priority: u8) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id: Cow::Borrowed(id),
                base_url: format!("http://{}.primary", id.to_lowercase()),
                backup_url: None,
                priority,
                rate_limit: RateLimitPolicy::Weighted {
                    capacity: 1000,
                    window: std::time::Duration::from_secs(60),
                },
                symbol: "XRP".to_string(),
            },
            behavior: Behavior::Ok,
            price: RawPrice {
                usd: Some(2.85),
                change_24h: Some(1.2),
                volume_24h: Some(9e9),
                market_cap: Some(162e9),
                high_24h: Some(2.9),
                low_24h: Some(2.8),
                last_updated_at: Some(1_700_000_000),
            },
            history: RawHistory::new(vec![
                RawPricePoint::new(1_700_000_000_000.0, 2.80),
                RawPricePoint::new(1_700_003_600_000.0, 2.85),
            ]),
            market: RawMarket {
                current_price: Some(2.85),
                market_cap: Some(162e9),
                total_volume: Some(9e9),
                price_change_24h: Some(0.034),
                price_change_percentage_24h: Some(1.2),
                high_24h: Some(2.9),
                low_24h: Some(2.8),
                circulating_supply: Some(57e9),
                total_supply: Some(99.987e9),
                market_cap_rank: Some(4),
                last_updated_at: Some(1_700_000_000),
            },
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_backup(mut self) -> Self {
        self.descriptor.backup_url = Some(format!(
            "http://{}.backup",
            self.descriptor.id.to_lowercase()
        ));
        self
    }

    pub fn with_price(mut self, price: RawPrice) -> Self {
        self.price = price;
        self
    }

    pub fn with_history(mut self, history: RawHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_market(mut self, market: RawMarket) -> Self {
        self.market = market;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn respond<T: Clone>(&self, base_url: &str, value: &T) -> Result<T, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(base_url.to_string());

        let provider = self.descriptor.id.to_string();
        match self.behavior {
            Behavior::Ok | Behavior::NoMarket => Ok(value.clone()),
            Behavior::Timeout => Err(MarketDataError::Timeout { provider }),
            Behavior::RateLimited => Err(MarketDataError::RateLimited { provider }),
            Behavior::PrimaryDown if base_url == self.descriptor.base_url => {
                Err(MarketDataError::HttpStatus {
                    provider,
                    status: 503,
                })
            }
            Behavior::PrimaryDown => Ok(value.clone()),
            Behavior::Panic => panic!("mock source {} exploded", provider),
        }
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch_price(&self, base_url: &str) -> Result<RawPrice, MarketDataError> {
        self.respond(base_url, &self.price)
    }

    async fn fetch_history(
        &self,
        base_url: &str,
        _period: HistoryPeriod,
    ) -> Result<RawHistory, MarketDataError> {
        self.respond(base_url, &self.history)
    }

    async fn fetch_market(&self, base_url: &str) -> Result<RawMarket, MarketDataError> {
        if self.behavior == Behavior::NoMarket {
            return Err(MarketDataError::UnsupportedOperation {
                operation: "market".to_string(),
                provider: self.descriptor.id.to_string(),
            });
        }
        self.respond(base_url, &self.market)
    }
}
