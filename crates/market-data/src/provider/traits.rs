//! Market data source trait definitions.
//!
//! This module defines the core `MarketDataSource` trait that all
//! upstream sources must implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{DataType, HistoryPeriod, RawHistory, RawMarket, RawPrice};

use super::descriptor::SourceDescriptor;

/// Trait for upstream market data sources.
///
/// Implement this trait to add support for a new source. The registry uses
/// the descriptor's priority and quota policy to decide when and how often
/// to call it, and hands each fetch the base URL to use (primary or backup).
///
/// Adapters only map the provider schema into raw payloads; validation and
/// fallback substitution happen in the registry, whatever the source.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use xrpwatch_market_data::provider::{MarketDataSource, SourceDescriptor};
///
/// struct MySource {
///     descriptor: SourceDescriptor,
/// }
///
/// #[async_trait]
/// impl MarketDataSource for MySource {
///     fn descriptor(&self) -> &SourceDescriptor {
///         &self.descriptor
///     }
///
///     // ... implement fetch methods
/// }
/// ```
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Static description: id, endpoints, priority, quota and symbol.
    fn descriptor(&self) -> &SourceDescriptor;

    /// Unique identifier, e.g. "COINGECKO".
    fn id(&self) -> &str {
        self.descriptor().id.as_ref()
    }

    /// Quota cost of one request for the given data type.
    fn weight(&self, data_type: DataType) -> u32 {
        let _ = data_type;
        1
    }

    /// Fetch the current price with 24h statistics.
    async fn fetch_price(&self, base_url: &str) -> Result<RawPrice, MarketDataError>;

    /// Fetch a historical series covering `period`.
    async fn fetch_history(
        &self,
        base_url: &str,
        period: HistoryPeriod,
    ) -> Result<RawHistory, MarketDataError>;

    /// Fetch a market snapshot.
    ///
    /// Default implementation returns `UnsupportedOperation`.
    async fn fetch_market(&self, base_url: &str) -> Result<RawMarket, MarketDataError> {
        let _ = base_url;
        Err(MarketDataError::UnsupportedOperation {
            operation: "market".to_string(),
            provider: self.id().to_string(),
        })
    }
}
