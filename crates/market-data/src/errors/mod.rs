//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining failover behavior
//!
//! None of these errors reach the public fetch operations of the service;
//! they drive health tracking internally and end up as batch error messages.

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::models::DataType;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the source registry should handle the error.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The source rate limited the request (HTTP 429).
    /// Counts as a failure and tightens the local rate limiter.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The source that rate limited the request
        provider: String,
    },

    /// The request to the source timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The source that timed out
        provider: String,
    },

    /// The source answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The source that answered
        provider: String,
        /// HTTP status code
        status: u16,
    },

    /// A source-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The source that returned the error
        provider: String,
        /// The error message from the source
        message: String,
    },

    /// The payload could not be decoded into the provider schema.
    #[error("Invalid payload from {provider}: {message}")]
    InvalidPayload {
        /// The source that sent the payload
        provider: String,
        /// Decoding failure
        message: String,
    },

    /// The source does not offer this kind of data.
    #[error("{operation} not supported by {provider}")]
    UnsupportedOperation {
        /// The operation requested
        operation: String,
        /// The source asked
        provider: String,
    },

    /// Every configured source was skipped or failed.
    #[error("All sources failed for {data_type}: {summary}")]
    AllSourcesFailed {
        /// Requested data type
        data_type: DataType,
        /// Per-source attempt summary
        summary: String,
    },

    /// Unknown history period string.
    #[error("Invalid history period: {0}")]
    InvalidPeriod(String),

    /// A network error occurred while communicating with a source.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use xrpwatch_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "BINANCE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::InvalidPeriod("fortnight".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::NextProvider);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::ProviderError { .. }
            | Self::InvalidPayload { .. }
            | Self::Network(_) => RetryClass::FailoverWithPenalty,

            // Not a failure of the source; nothing to hold against it.
            Self::UnsupportedOperation { .. }
            | Self::AllSourcesFailed { .. }
            | Self::InvalidPeriod(_) => RetryClass::NextProvider,
        }
    }

    /// True for upstream 429 responses.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429,
            _ => false,
        }
    }
}
