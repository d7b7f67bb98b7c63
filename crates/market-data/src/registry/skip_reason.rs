//! Per-call diagnostics of source selection.

use std::fmt;

use crate::models::SourceId;
use crate::provider::EndpointKind;

/// Why a source was skipped during a fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The source is inside its backoff window.
    BackoffActive,

    /// The source does not offer this data type.
    NotSupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackoffActive => write!(f, "backoff active"),
            Self::NotSupported => write!(f, "not supported"),
        }
    }
}

/// Record of a single source attempt during a fetch.
#[derive(Clone, Debug)]
pub struct SourceAttempt {
    pub source_id: SourceId,
    /// Endpoint called, `None` for skips.
    pub endpoint: Option<EndpointKind>,
    pub skipped: Option<SkipReason>,
    pub error: Option<String>,
    pub success: bool,
}

/// Trace of one fetch across sources and endpoints.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<SourceAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, source_id: SourceId, reason: SkipReason) {
        self.attempts.push(SourceAttempt {
            source_id,
            endpoint: None,
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, source_id: SourceId, endpoint: EndpointKind, error: String) {
        self.attempts.push(SourceAttempt {
            source_id,
            endpoint: Some(endpoint),
            skipped: None,
            error: Some(error),
            success: false,
        });
    }

    pub fn record_success(&mut self, source_id: SourceId, endpoint: EndpointKind) {
        self.attempts.push(SourceAttempt {
            source_id,
            endpoint: Some(endpoint),
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging, e.g. `COINGECKO: SKIPPED (backoff active) -> BINANCE: SUCCESS`.
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no sources configured".to_string();
        }

        self.attempts
            .iter()
            .map(|a| {
                let label = match a.endpoint {
                    Some(EndpointKind::Backup) => format!("{} (backup)", a.source_id),
                    _ => a.source_id.to_string(),
                };
                if a.success {
                    format!("{}: SUCCESS", label)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({})", label, skip)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({})", label, err)
                } else {
                    format!("{}: UNKNOWN", label)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    /// Number of endpoint calls that went out.
    pub fn requests(&self) -> usize {
        self.attempts.iter().filter(|a| a.endpoint.is_some()).count()
    }

    pub fn skip_reasons(&self) -> Vec<(&SourceId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (&a.source_id, s)))
            .collect()
    }

    pub fn errors(&self) -> Vec<(&SourceId, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_ref().map(|e| (&a.source_id, e.as_str())))
            .collect()
    }
}
