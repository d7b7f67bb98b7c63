//! Per-source rate limiter.
//!
//! Two quota shapes are supported, matching [`RateLimitPolicy`]:
//! - Weighted: a window of fixed length with a weight capacity. A request
//!   that does not fit sleeps until the window rolls over.
//! - Interval: calls are evenly spaced. Each caller reserves its slot under
//!   the lock and then sleeps until it, so concurrent callers queue up.
//!
//! Callers are delayed, never rejected.
//!
//! Windows are measured on the tokio clock rather than the injected
//! [`Clock`](crate::clock::Clock): waiting is a `tokio::time::sleep`, and both
//! must agree. Tests drive it with paused tokio time.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::provider::RateLimitPolicy;

/// Quota state of one source.
#[derive(Debug)]
enum QuotaWindow {
    Weighted {
        capacity: u32,
        window: Duration,
        window_start: Instant,
        used: u32,
    },
    Interval {
        min_interval: Duration,
        next_slot: Option<Instant>,
    },
}

/// Outcome of a reservation attempt.
#[derive(Debug, Eq, PartialEq)]
enum Admission {
    /// Go now.
    Now,
    /// A slot was reserved; go after sleeping this long.
    Reserved(Duration),
    /// Nothing was reserved; sleep this long and try again.
    Retry(Duration),
}

impl QuotaWindow {
    fn new(policy: RateLimitPolicy, now: Instant) -> Self {
        match policy {
            RateLimitPolicy::Weighted { capacity, window } => Self::Weighted {
                capacity: capacity.max(1),
                window,
                window_start: now,
                used: 0,
            },
            RateLimitPolicy::Interval { .. } => Self::Interval {
                min_interval: policy.min_interval().unwrap_or_default(),
                next_slot: None,
            },
        }
    }

    /// Roll a weighted window over once its age has reached its length.
    fn roll(&mut self, now: Instant) {
        if let Self::Weighted {
            window,
            window_start,
            used,
            ..
        } = self
        {
            if now.saturating_duration_since(*window_start) >= *window {
                *window_start = now;
                *used = 0;
            }
        }
    }

    fn reserve(&mut self, weight: u32, now: Instant) -> Admission {
        self.roll(now);

        match self {
            Self::Weighted {
                capacity,
                window,
                window_start,
                used,
            } => {
                // An oversized request gets a whole window to itself.
                let weight = weight.min(*capacity);
                if *used + weight > *capacity {
                    let elapsed = now.saturating_duration_since(*window_start);
                    return Admission::Retry(window.saturating_sub(elapsed));
                }
                *used += weight;
                Admission::Now
            }
            Self::Interval {
                min_interval,
                next_slot,
            } => {
                let slot = next_slot.map_or(now, |next| next.max(now));
                *next_slot = Some(slot + *min_interval);
                if slot > now {
                    Admission::Reserved(slot - now)
                } else {
                    Admission::Now
                }
            }
        }
    }

    fn penalize(&mut self, now: Instant) {
        self.roll(now);

        match self {
            Self::Weighted { capacity, used, .. } => *used = *capacity,
            Self::Interval {
                min_interval,
                next_slot,
            } => {
                let base = next_slot.map_or(now, |next| next.max(now));
                *next_slot = Some(base + *min_interval);
            }
        }
    }

    fn remaining(&mut self, now: Instant) -> u32 {
        self.roll(now);

        match self {
            Self::Weighted { capacity, used, .. } => capacity.saturating_sub(*used),
            Self::Interval { next_slot, .. } => match next_slot {
                Some(next) if *next > now => 0,
                _ => 1,
            },
        }
    }
}

/// Rate limiter for multiple sources.
///
/// Thread-safe. Windows are created on first use from the policy registered
/// with [`configure`](Self::configure), or the default policy otherwise.
pub struct RateLimiter {
    /// Per-source quota windows.
    windows: Mutex<HashMap<String, QuotaWindow>>,
    /// Per-source policies.
    policies: Mutex<HashMap<String, RateLimitPolicy>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the windows mutex, recovering from poison if necessary.
    ///
    /// The worst case of a recovered lock is a slightly wrong quota count,
    /// which beats panicking in the fetch path.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, QuotaWindow>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter windows mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_policies(&self) -> MutexGuard<'_, HashMap<String, RateLimitPolicy>> {
        self.policies.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter policies mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Register the policy for a source. Resets any existing window.
    pub fn configure(&self, source: &str, policy: RateLimitPolicy) {
        let mut policies = self.lock_policies();
        policies.insert(source.to_string(), policy);
        drop(policies); // Release policies lock before acquiring windows lock

        self.lock_windows().remove(source);
    }

    /// Wait until a request of `weight` may be sent to `source`.
    pub async fn acquire(&self, source: &str, weight: u32) {
        loop {
            let admission = {
                let mut windows = self.lock_windows();
                let now = Instant::now();
                let quota = windows
                    .entry(source.to_string())
                    .or_insert_with(|| self.create_window(source, now));
                quota.reserve(weight, now)
            };

            match admission {
                Admission::Now => {
                    debug!("Rate limiter: admitted '{}' (weight {})", source, weight);
                    return;
                }
                Admission::Reserved(wait) => {
                    debug!("Rate limiter: slot for '{}' in {:?}", source, wait);
                    tokio::time::sleep(wait).await;
                    return;
                }
                Admission::Retry(wait) => {
                    debug!(
                        "Rate limiter: window of '{}' exhausted, waiting {:?}",
                        source, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Tighten the quota of a source after it answered 429.
    pub fn penalize(&self, source: &str) {
        let mut windows = self.lock_windows();
        let now = Instant::now();
        windows
            .entry(source.to_string())
            .or_insert_with(|| self.create_window(source, now))
            .penalize(now);
        debug!("Rate limiter: penalized '{}'", source);
    }

    /// Weight units left in the current window (0 or 1 for interval sources).
    pub fn remaining(&self, source: &str) -> u32 {
        let mut windows = self.lock_windows();
        let now = Instant::now();
        windows
            .entry(source.to_string())
            .or_insert_with(|| self.create_window(source, now))
            .remaining(now)
    }

    /// Forget the quota state of a source.
    pub fn reset(&self, source: &str) {
        self.lock_windows().remove(source);
    }

    fn create_window(&self, source: &str, now: Instant) -> QuotaWindow {
        let policy = self
            .lock_policies()
            .get(source)
            .copied()
            .unwrap_or_default();
        QuotaWindow::new(policy, now)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(capacity: u32, secs: u64) -> RateLimitPolicy {
        RateLimitPolicy::Weighted {
            capacity,
            window: Duration::from_secs(secs),
        }
    }

    fn interval(requests: u32, secs: u64) -> RateLimitPolicy {
        RateLimitPolicy::Interval {
            requests,
            window: Duration::from_secs(secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_weighted_never_exceeds_quota() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", weighted(5, 60));

        let start = Instant::now();
        for _ in 0..12 {
            limiter.acquire("BINANCE", 1).await;
        }

        // 12 requests at capacity 5 span three windows.
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert!(start.elapsed() < Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_weighted_capacity_is_immediate() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", weighted(10, 60));

        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire("BINANCE", 2).await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining("BINANCE"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_weighted_window_rolls_over() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", weighted(2, 60));

        limiter.acquire("BINANCE", 2).await;
        assert_eq!(limiter.remaining("BINANCE"), 0);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.remaining("BINANCE"), 2);

        let start = Instant::now();
        limiter.acquire("BINANCE", 1).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining("BINANCE"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_weight_gets_fresh_window() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", weighted(3, 60));

        let start = Instant::now();
        limiter.acquire("BINANCE", 10).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire("BINANCE", 1).await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_spacing() {
        let limiter = RateLimiter::new();
        limiter.configure("COINGECKO", interval(10, 60));

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("COINGECKO", 1).await;
        }

        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_concurrent_callers_queue() {
        let limiter = std::sync::Arc::new(RateLimiter::new());
        limiter.configure("COINGECKO", interval(10, 60));

        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire("COINGECKO", 1).await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - start);
        }
        finished.sort();

        assert_eq!(
            finished,
            vec![
                Duration::ZERO,
                Duration::from_secs(6),
                Duration::from_secs(12)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_penalize_weighted_exhausts_window() {
        let limiter = RateLimiter::new();
        limiter.configure("BINANCE", weighted(1200, 60));

        limiter.penalize("BINANCE");
        assert_eq!(limiter.remaining("BINANCE"), 0);

        let start = Instant::now();
        limiter.acquire("BINANCE", 2).await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_penalize_interval_adds_one_interval() {
        let limiter = RateLimiter::new();
        limiter.configure("CRYPTOCOMPARE", interval(60, 60));

        limiter.acquire("CRYPTOCOMPARE", 1).await;
        limiter.penalize("CRYPTOCOMPARE");

        let start = Instant::now();
        limiter.acquire("CRYPTOCOMPARE", 1).await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_source_isolation_and_reset() {
        let limiter = RateLimiter::new();
        limiter.configure("A", weighted(1, 60));
        limiter.configure("B", weighted(1, 60));

        limiter.acquire("A", 1).await;
        assert_eq!(limiter.remaining("A"), 0);
        assert_eq!(limiter.remaining("B"), 1);

        limiter.reset("A");
        assert_eq!(limiter.remaining("A"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_source_uses_default_policy() {
        let limiter = RateLimiter::new();

        // Default is one call per second.
        let start = Instant::now();
        limiter.acquire("UNKNOWN", 1).await;
        limiter.acquire("UNKNOWN", 1).await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
