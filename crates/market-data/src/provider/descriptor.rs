//! Source descriptors and rate limit policies.
//!
//! A descriptor is the static half of a source: identity, endpoints,
//! priority, quota policy and symbol mapping. It never changes after
//! the source is constructed.

use std::fmt;
use std::time::Duration;

use crate::models::{SourceId, SourceSymbol};

/// Quota policy of a source.
///
/// Controls how aggressively we can call a source to avoid
/// hitting its limits and getting blocked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RateLimitPolicy {
    /// At most `capacity` weight units per `window` (exchange-style weights).
    Weighted { capacity: u32, window: Duration },
    /// At most `requests` calls per `window`, evenly spaced.
    Interval { requests: u32, window: Duration },
}

impl RateLimitPolicy {
    /// Minimum spacing between calls for interval policies.
    pub fn min_interval(&self) -> Option<Duration> {
        match self {
            Self::Interval { requests, window } => Some(*window / (*requests).max(1)),
            Self::Weighted { .. } => None,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::Interval {
            requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Which endpoint of a source a request went to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointKind {
    Primary,
    Backup,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Backup => write!(f, "backup"),
        }
    }
}

/// A base URL to call.
#[derive(Clone, Copy, Debug)]
pub struct Endpoint<'a> {
    pub kind: EndpointKind,
    pub base_url: &'a str,
}

/// Static description of an upstream source.
#[derive(Clone, Debug)]
pub struct SourceDescriptor {
    /// Unique identifier (e.g. "COINGECKO"), used for health and quota tracking.
    pub id: SourceId,

    pub base_url: String,

    /// Tried once per call after a failure of the primary endpoint.
    pub backup_url: Option<String>,

    /// Lower values are tried first.
    pub priority: u8,

    pub rate_limit: RateLimitPolicy,

    /// The tracked asset's symbol on this source.
    pub symbol: SourceSymbol,
}

impl SourceDescriptor {
    /// Endpoints in the order they are tried.
    pub fn endpoints(&self) -> Vec<Endpoint<'_>> {
        let mut endpoints = vec![Endpoint {
            kind: EndpointKind::Primary,
            base_url: self.base_url.as_str(),
        }];

        if let Some(backup) = self.backup_url.as_deref() {
            endpoints.push(Endpoint {
                kind: EndpointKind::Backup,
                base_url: backup,
            });
        }

        endpoints
    }
}
