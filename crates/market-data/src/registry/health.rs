//! Per-source health tracking with exponential backoff.
//!
//! Every failure pushes a source's `backoff_until` further out:
//!
//! ```text
//! backoff(k) = min(base_delay * 2^(k-1), max_backoff)
//! ```
//!
//! where `k` is the number of consecutive failures. Once `k` reaches the
//! failure threshold the source is skipped until its backoff has elapsed.
//! Failures older than `failure_decay` are forgotten, and any success clears
//! the record.
//!
//! Transitions live in the pure [`next_health_state`]; [`HealthTracker`] only
//! stores the states and reads time from a [`Clock`]. State is in-memory and
//! resets when the process restarts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::{
    DEFAULT_BASE_DELAY, DEFAULT_FAILURE_DECAY, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES,
};
use crate::errors::MarketDataError;

/// Backoff parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackoffPolicy {
    /// Consecutive failures at which a source stops being selected.
    pub failure_threshold: u32,
    /// Backoff after the first failure.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_backoff: Duration,
    /// Age after which the last failure no longer counts.
    pub failure_decay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: DEFAULT_MAX_BACKOFF,
            failure_decay: DEFAULT_FAILURE_DECAY,
        }
    }
}

impl BackoffPolicy {
    /// Backoff after `failures` consecutive failures.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failures - 1);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Health of one source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HealthState {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
    pub backoff_until: Option<Instant>,
}

impl HealthState {
    /// Whether the source may be selected at `now`.
    ///
    /// Expects a state that already went through [`HealthEvent::Observe`].
    pub fn is_available(&self, now: Instant, policy: &BackoffPolicy) -> bool {
        let in_backoff = self.backoff_until.is_some_and(|until| now < until);
        !(self.consecutive_failures >= policy.failure_threshold && in_backoff)
    }

    /// Time left in the backoff window.
    pub fn backoff_remaining(&self, now: Instant) -> Option<Duration> {
        self.backoff_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }
}

/// Input to a health transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HealthEvent {
    Success,
    Failure,
    /// No outcome, only let time act (failure decay).
    Observe,
}

/// Compute the state that follows `event` at `now`.
pub fn next_health_state(
    current: &HealthState,
    event: HealthEvent,
    now: Instant,
    policy: &BackoffPolicy,
) -> HealthState {
    let decayed = match current.last_failure_at {
        Some(at) if now.saturating_duration_since(at) > policy.failure_decay => HealthState {
            consecutive_failures: 0,
            backoff_until: None,
            ..*current
        },
        _ => *current,
    };

    match event {
        HealthEvent::Observe => decayed,
        HealthEvent::Success => HealthState {
            consecutive_failures: 0,
            backoff_until: None,
            ..decayed
        },
        HealthEvent::Failure => {
            let failures = decayed.consecutive_failures.saturating_add(1);
            HealthState {
                consecutive_failures: failures,
                last_failure_at: Some(now),
                backoff_until: Some(now + policy.backoff_for(failures)),
            }
        }
    }
}

/// Health metrics for one source, for logging and diagnostics.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source: String,
    pub available: bool,
    pub consecutive_failures: u32,
    /// Milliseconds left in the backoff window, if any.
    pub backoff_remaining_ms: Option<u64>,
    pub total_successes: u64,
    pub total_failures: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct SourceRecord {
    state: HealthState,
    successes: u64,
    failures: u64,
    last_error: Option<String>,
}

/// Thread-safe per-source health tracker.
pub struct HealthTracker {
    records: Mutex<HashMap<String, SourceRecord>>,
    policy: BackoffPolicy,
    clock: Arc<dyn Clock>,
}

impl HealthTracker {
    pub fn new(policy: BackoffPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            policy,
            clock,
        }
    }

    /// Lock the records mutex, recovering from poison if necessary.
    fn lock_records(&self) -> MutexGuard<'_, HashMap<String, SourceRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| {
            warn!("Health tracker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Check whether a source may be selected. Applies failure decay first.
    pub fn is_available(&self, source: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.lock_records();
        let record = records.entry(source.to_string()).or_default();

        let state = next_health_state(&record.state, HealthEvent::Observe, now, &self.policy);
        if state.consecutive_failures == 0 && record.state.consecutive_failures > 0 {
            debug!(
                "Health: failures of '{}' decayed after {:?}",
                source, self.policy.failure_decay
            );
        }
        record.state = state;

        state.is_available(now, &self.policy)
    }

    /// Record a successful request.
    pub fn record_success(&self, source: &str) {
        let now = self.clock.now();
        let mut records = self.lock_records();
        let record = records.entry(source.to_string()).or_default();

        if record.state.consecutive_failures > 0 {
            info!(
                "Health: '{}' recovered after {} failures",
                source, record.state.consecutive_failures
            );
        }

        record.state = next_health_state(&record.state, HealthEvent::Success, now, &self.policy);
        record.successes += 1;
    }

    /// Record a failed request and extend the source's backoff.
    pub fn record_failure(&self, source: &str, error: &MarketDataError) {
        let now = self.clock.now();
        let mut records = self.lock_records();
        let record = records.entry(source.to_string()).or_default();

        record.state = next_health_state(&record.state, HealthEvent::Failure, now, &self.policy);
        record.failures += 1;
        record.last_error = Some(error.to_string());

        let failures = record.state.consecutive_failures;
        let backoff = self.policy.backoff_for(failures);
        if failures >= self.policy.failure_threshold {
            warn!(
                "Health: '{}' unavailable for {:?} after {} consecutive failures: {}",
                source, backoff, failures, error
            );
        } else {
            debug!(
                "Health: failure {}/{} for '{}' (backoff {:?}): {}",
                failures, self.policy.failure_threshold, source, backoff, error
            );
        }
    }

    /// Current state of a source, without applying decay.
    pub fn state(&self, source: &str) -> HealthState {
        self.lock_records()
            .get(source)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    /// Metrics for every source seen so far, sorted by id.
    pub fn snapshot(&self) -> Vec<SourceHealth> {
        let now = self.clock.now();
        let records = self.lock_records();

        let mut health: Vec<SourceHealth> = records
            .iter()
            .map(|(source, record)| {
                let state =
                    next_health_state(&record.state, HealthEvent::Observe, now, &self.policy);
                SourceHealth {
                    source: source.clone(),
                    available: state.is_available(now, &self.policy),
                    consecutive_failures: state.consecutive_failures,
                    backoff_remaining_ms: state
                        .backoff_remaining(now)
                        .map(|d| d.as_millis() as u64),
                    total_successes: record.successes,
                    total_failures: record.failures,
                    last_error: record.last_error.clone(),
                }
            })
            .collect();

        health.sort_by(|a, b| a.source.cmp(&b.source));
        health
    }

    /// Forget everything about a source.
    pub fn reset(&self, source: &str) {
        self.lock_records().remove(source);
    }

    pub fn reset_all(&self) {
        self.lock_records().clear();
    }
}
