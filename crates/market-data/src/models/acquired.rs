//! Result envelope separating upstream data from synthesized data.

use std::fmt;

use serde::Serialize;

use super::types::SourceId;

/// Source label used for synthesized data.
pub const SYNTHETIC_SOURCE: &str = "synthetic";

/// Why a value had to be synthesized.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DegradedReason {
    /// Every source was skipped or failed.
    SourcesExhausted(String),
    /// A source answered but nothing survived validation.
    NoValidData(String),
    /// An unexpected failure while assembling the result.
    Critical(String),
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourcesExhausted(msg) => write!(f, "all sources exhausted: {}", msg),
            Self::NoValidData(msg) => write!(f, "no valid data: {}", msg),
            Self::Critical(msg) => write!(f, "critical failure: {}", msg),
        }
    }
}

/// Data returned by the acquisition layer.
///
/// Callers must decide how to treat `Synthetic` values; they are schema-valid
/// but fabricated and should be shown as degraded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Acquired<T> {
    /// Fetched from an upstream source (possibly served from cache).
    Real { data: T, source: SourceId },
    /// Produced by the fallback synthesizer.
    Synthetic { data: T, reason: DegradedReason },
}

impl<T> Acquired<T> {
    pub fn real(data: T, source: SourceId) -> Self {
        Self::Real { data, source }
    }

    pub fn synthetic(data: T, reason: DegradedReason) -> Self {
        Self::Synthetic { data, reason }
    }

    pub fn data(&self) -> &T {
        match self {
            Self::Real { data, .. } | Self::Synthetic { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Self::Real { data, .. } | Self::Synthetic { data, .. } => data,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real { .. })
    }

    pub fn is_synthetic(&self) -> bool {
        !self.is_real()
    }

    /// Source id for real data, `"synthetic"` otherwise.
    pub fn source(&self) -> &str {
        match self {
            Self::Real { source, .. } => source.as_ref(),
            Self::Synthetic { .. } => SYNTHETIC_SOURCE,
        }
    }

    pub fn reason(&self) -> Option<&DegradedReason> {
        match self {
            Self::Real { .. } => None,
            Self::Synthetic { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Acquired<U> {
        match self {
            Self::Real { data, source } => Acquired::Real {
                data: f(data),
                source,
            },
            Self::Synthetic { data, reason } => Acquired::Synthetic {
                data: f(data),
                reason,
            },
        }
    }
}
