//! XRPWatch Market Data Crate
//!
//! This crate acquires XRP market data from several public price APIs and
//! always answers with schema-valid records, falling back to synthetic data
//! when every upstream source is unavailable.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple sources: CoinGecko, Binance, CryptoCompare (with backup endpoints)
//! - Weight-based and interval-based rate limiting per source
//! - Health tracking with exponential backoff
//! - Per-data-type TTL caching
//! - Sanitization of upstream payloads into a canonical schema
//! - Graceful degradation to clearly tagged synthetic data
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! | MarketDataService| --> |  ResponseCache   |  (TTL per data type)
//! +------------------+     +------------------+
//!          | miss
//!          v
//! +------------------+     +------------------+
//! |  SourceRegistry  | --> | HealthTracker +  |  (skip sources in backoff,
//! +------------------+     |   RateLimiter    |   wait for quota)
//!          |               +------------------+
//!          v
//! +------------------+
//! | MarketDataSource |  (CoinGecko, Binance, CryptoCompare)
//! +------------------+
//!          | raw payload
//!          v
//! +------------------+     exhausted     +---------------------+
//! |    Sanitizer     |  ------------->   | FallbackSynthesizer |
//! +------------------+                   +---------------------+
//!          |                                        |
//!          v                                        v
//!   Acquired::Real                          Acquired::Synthetic
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataService`] - Entry point owning all mutable state
//! - [`Acquired`] - Real or synthetic result envelope
//! - [`PriceRecord`], [`HistoricalSeries`], [`MarketSnapshot`] - Canonical records
//! - [`BatchData`] - Result of one concurrent polling round
//! - [`MarketDataConfig`] - Service configuration
//! - [`MarketDataError`] - Internal error type, never returned by the service

pub mod clock;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, FallbackBounds, MarketDataConfig, SourceSettings, SourcesConfig, XrpSymbols,
};
pub use errors::{MarketDataError, RetryClass};
pub use fallback::FallbackSynthesizer;
pub use service::MarketDataService;

// Re-export all public types from models
pub use models::{
    Acquired, BatchData, BatchError, BatchErrorKind, DataType, DegradedReason, HistoricalSeries,
    HistoryPeriod, MarketSnapshot, PricePoint, PriceRecord, SourceId, SYNTHETIC_SOURCE,
};

// Re-export provider types
pub use provider::binance::BinanceSource;
pub use provider::coingecko::CoinGeckoSource;
pub use provider::cryptocompare::CryptoCompareSource;
pub use provider::{MarketDataSource, RateLimitPolicy, SourceDescriptor};

// Re-export registry types
pub use registry::{
    CacheStats, FetchDiagnostics, HealthTracker, RateLimiter, ResponseCache, Sanitizer,
    SkipReason, SourceHealth, SourceRegistry,
};
