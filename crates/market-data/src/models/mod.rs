//! Market data models
//!
//! This module contains the core data types of the acquisition layer:
//! - `types` - Type aliases for identifiers (SourceId, SourceSymbol)
//! - `data_type` - Logical data types (DataType) and history periods (HistoryPeriod)
//! - `price` / `history` / `market` - Canonical records returned to callers
//! - `raw` - Loose pre-validation payloads produced by source adapters
//! - `acquired` - Real/Synthetic result envelope (Acquired, DegradedReason)
//! - `batch` - Batch result assembled by the service (BatchData, BatchError)

mod acquired;
mod batch;
mod data_type;
mod history;
mod market;
mod price;
mod raw;
mod types;

pub use acquired::{Acquired, DegradedReason, SYNTHETIC_SOURCE};
pub use batch::{BatchData, BatchError, BatchErrorKind};
pub use data_type::{DataType, HistoryPeriod};
pub use history::{HistoricalSeries, PricePoint};
pub use market::MarketSnapshot;
pub use price::PriceRecord;
pub use raw::{RawHistory, RawMarket, RawPrice, RawPricePoint};
pub(crate) use raw::json_number;
pub use types::{SourceId, SourceSymbol};
