//! Market data source abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataSource` trait that all sources implement
//! - Source descriptors and rate limit policies
//! - Concrete source adapters (CoinGecko, Binance, CryptoCompare)
//!
//! # Architecture
//!
//! The source system is designed to be:
//! - **Source-agnostic**: The registry doesn't know about specific sources
//! - **Extensible**: New sources can be added by implementing `MarketDataSource`
//! - **Resilient**: Rate limiting and health backoff protect against source failures
//!
//! Adapters only translate provider schemas into raw payloads. They never
//! validate, cache or fall back; that all happens above them.

mod descriptor;
mod http;
mod traits;

pub mod binance;
pub mod coingecko;
pub mod cryptocompare;

pub use descriptor::{Endpoint, EndpointKind, RateLimitPolicy, SourceDescriptor};
pub use traits::MarketDataSource;
