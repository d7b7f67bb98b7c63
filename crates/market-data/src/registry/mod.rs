//! Source registry module.
//!
//! This module provides orchestration for upstream sources, including:
//! - Source registration and priority ordering
//! - Rate limiting per source
//! - Health tracking with exponential backoff
//! - TTL caching of canonical records
//! - Payload sanitization

mod cache;
mod health;
mod rate_limiter;
mod registry;
mod sanitizer;
mod skip_reason;

pub use cache::{CacheKey, CacheStats, Cacheable, CachedData, ResponseCache};
pub use health::{
    next_health_state, BackoffPolicy, HealthEvent, HealthState, HealthTracker, SourceHealth,
};
pub use rate_limiter::RateLimiter;
pub use registry::{
    Fetched, HistoryRequest, MarketRequest, PriceRequest, SourceRegistry, SourceRequest,
};
pub use sanitizer::{
    Sanitized, Sanitizer, ValidationIssue, ValidationSeverity, DERIVED_HIGH_FACTOR,
    DERIVED_LOW_FACTOR,
};
pub use skip_reason::{FetchDiagnostics, SkipReason, SourceAttempt};
