//! Source registry for orchestrating upstream market data sources.
//!
//! The registry owns the sources in priority order and handles:
//! - Skipping sources that are in backoff
//! - Rate limiting per source
//! - Retrying the backup endpoint of a source once
//! - Falling through to the next source on failure
//! - Health bookkeeping for every outcome

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::{FetchDiagnostics, HealthTracker, RateLimiter, SkipReason};
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{DataType, HistoryPeriod, RawHistory, RawMarket, RawPrice, SourceId};
use crate::provider::{EndpointKind, MarketDataSource};

/// One kind of upstream request, executable against any source.
#[async_trait]
pub trait SourceRequest: Send + Sync {
    type Output: Send;

    fn data_type(&self) -> DataType;

    async fn execute(
        &self,
        source: &dyn MarketDataSource,
        base_url: &str,
    ) -> Result<Self::Output, MarketDataError>;
}

/// Current price request.
#[derive(Clone, Copy, Debug)]
pub struct PriceRequest;

/// Historical series request.
#[derive(Clone, Copy, Debug)]
pub struct HistoryRequest(pub HistoryPeriod);

/// Market snapshot request.
#[derive(Clone, Copy, Debug)]
pub struct MarketRequest;

#[async_trait]
impl SourceRequest for PriceRequest {
    type Output = RawPrice;

    fn data_type(&self) -> DataType {
        DataType::Price
    }

    async fn execute(
        &self,
        source: &dyn MarketDataSource,
        base_url: &str,
    ) -> Result<RawPrice, MarketDataError> {
        source.fetch_price(base_url).await
    }
}

#[async_trait]
impl SourceRequest for HistoryRequest {
    type Output = RawHistory;

    fn data_type(&self) -> DataType {
        DataType::Historical
    }

    async fn execute(
        &self,
        source: &dyn MarketDataSource,
        base_url: &str,
    ) -> Result<RawHistory, MarketDataError> {
        source.fetch_history(base_url, self.0).await
    }
}

#[async_trait]
impl SourceRequest for MarketRequest {
    type Output = RawMarket;

    fn data_type(&self) -> DataType {
        DataType::Market
    }

    async fn execute(
        &self,
        source: &dyn MarketDataSource,
        base_url: &str,
    ) -> Result<RawMarket, MarketDataError> {
        source.fetch_market(base_url).await
    }
}

/// A raw payload and where it came from.
#[derive(Clone, Debug)]
pub struct Fetched<T> {
    pub data: T,
    pub source: SourceId,
    pub endpoint: EndpointKind,
}

/// Source registry for orchestrating upstream fetches.
pub struct SourceRegistry {
    sources: Vec<Arc<dyn MarketDataSource>>,
    rate_limiter: RateLimiter,
    health: HealthTracker,
}

impl SourceRegistry {
    /// Create a registry. Sources are ordered by ascending priority and their
    /// quota policies registered with the rate limiter.
    pub fn new(mut sources: Vec<Arc<dyn MarketDataSource>>, health: HealthTracker) -> Self {
        sources.sort_by_key(|source| source.descriptor().priority);

        let rate_limiter = RateLimiter::new();
        for source in &sources {
            let descriptor = source.descriptor();
            rate_limiter.configure(&descriptor.id, descriptor.rate_limit);
        }

        Self {
            sources,
            rate_limiter,
            health,
        }
    }

    /// Sources in the order they are tried.
    pub fn sources(&self) -> &[Arc<dyn MarketDataSource>] {
        &self.sources
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Fetch from the first source that answers.
    pub async fn fetch<R: SourceRequest>(
        &self,
        request: &R,
    ) -> Result<Fetched<R::Output>, MarketDataError> {
        self.fetch_with_diagnostics(request).await.0
    }

    /// Fetch and return a trace of every source considered.
    ///
    /// Tries sources in priority order:
    /// 1. Skip the source if it is in backoff
    /// 2. Apply rate limiting
    /// 3. Call the primary endpoint, then the backup once on failure
    /// 4. On failure, act on the error's retry class
    pub async fn fetch_with_diagnostics<R: SourceRequest>(
        &self,
        request: &R,
    ) -> (Result<Fetched<R::Output>, MarketDataError>, FetchDiagnostics) {
        let data_type = request.data_type();
        let mut diagnostics = FetchDiagnostics::new();

        for source in &self.sources {
            let descriptor = source.descriptor();
            let source_id = descriptor.id.clone();

            if !self.health.is_available(&source_id) {
                debug!("Source '{}' is in backoff, skipping", source_id);
                diagnostics.record_skip(source_id, SkipReason::BackoffActive);
                continue;
            }

            let weight = source.weight(data_type);

            for endpoint in descriptor.endpoints() {
                self.rate_limiter.acquire(&source_id, weight).await;

                debug!(
                    "Fetching {} from '{}' ({})",
                    data_type, source_id, endpoint.kind
                );

                let error = match request.execute(source.as_ref(), endpoint.base_url).await {
                    Ok(data) => {
                        self.health.record_success(&source_id);
                        diagnostics.record_success(source_id.clone(), endpoint.kind);
                        info!(
                            "Fetched {} from '{}' ({})",
                            data_type, source_id, endpoint.kind
                        );
                        return (
                            Ok(Fetched {
                                data,
                                source: source_id,
                                endpoint: endpoint.kind,
                            }),
                            diagnostics,
                        );
                    }
                    Err(e) => e,
                };

                match error.retry_class() {
                    RetryClass::FailoverWithPenalty => {
                        self.health.record_failure(&source_id, &error);
                        if error.is_rate_limited() {
                            self.rate_limiter.penalize(&source_id);
                        }
                        warn!(
                            "Source '{}' ({}) failed: {}",
                            source_id, endpoint.kind, error
                        );
                        diagnostics.record_error(
                            source_id.clone(),
                            endpoint.kind,
                            error.to_string(),
                        );
                    }
                    RetryClass::NextProvider => {
                        debug!("Source '{}' can't serve {}: {}", source_id, data_type, error);
                        diagnostics.record_skip(source_id.clone(), SkipReason::NotSupported);
                        break;
                    }
                }
            }
        }

        let summary = diagnostics.summary();
        warn!("All sources failed for {}: {}", data_type, summary);

        (
            Err(MarketDataError::AllSourcesFailed { data_type, summary }),
            diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::registry::BackoffPolicy;
    use crate::testing::{Behavior, MockSource};

    fn registry(sources: Vec<Arc<MockSource>>) -> SourceRegistry {
        let sources: Vec<Arc<dyn MarketDataSource>> = sources
            .into_iter()
            .map(|s| s as Arc<dyn MarketDataSource>)
            .collect();
        let health = HealthTracker::new(BackoffPolicy::default(), Arc::new(ManualClock::new()));
        SourceRegistry::new(sources, health)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_tried_in_priority_order() {
        let low = Arc::new(MockSource::new("LOW", 2));
        let high = Arc::new(MockSource::new("HIGH", 1));
        let registry = registry(vec![low.clone(), high.clone()]);

        let fetched = registry.fetch(&PriceRequest).await.unwrap();
        assert_eq!(fetched.source, "HIGH");
        assert_eq!(high.calls(), 1);
        assert_eq!(low.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failover_records_health() {
        let a = Arc::new(MockSource::new("A", 1).with_behavior(Behavior::Timeout));
        let b = Arc::new(MockSource::new("B", 2));
        let registry = registry(vec![a.clone(), b.clone()]);

        let (result, diagnostics) = registry.fetch_with_diagnostics(&PriceRequest).await;
        let fetched = result.unwrap();

        assert_eq!(fetched.source, "B");
        assert_eq!(fetched.data.usd, Some(2.85));
        assert_eq!(registry.health().state("A").consecutive_failures, 1);
        assert_eq!(registry.health().snapshot()[1].total_successes, 1);
        assert_eq!(diagnostics.summary(), "A: ERROR (Timeout: A) -> B: SUCCESS");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_endpoint_tried_once() {
        let a = Arc::new(
            MockSource::new("A", 1)
                .with_behavior(Behavior::PrimaryDown)
                .with_backup(),
        );
        let registry = registry(vec![a.clone()]);

        let fetched = registry.fetch(&MarketRequest).await.unwrap();
        assert_eq!(fetched.endpoint, EndpointKind::Backup);
        assert_eq!(a.urls(), vec!["http://a.primary", "http://a.backup"]);
        // The primary failure still counts against the source.
        assert_eq!(registry.health().state("A").consecutive_failures, 0);
        assert_eq!(registry.health().snapshot()[0].total_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_failure_moves_on() {
        let a = Arc::new(
            MockSource::new("A", 1)
                .with_behavior(Behavior::Timeout)
                .with_backup(),
        );
        let b = Arc::new(MockSource::new("B", 2));
        let registry = registry(vec![a.clone(), b.clone()]);

        let fetched = registry.fetch(&PriceRequest).await.unwrap();
        assert_eq!(fetched.source, "B");
        assert_eq!(a.calls(), 2);
        assert_eq!(registry.health().state("A").consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_source_skipped() {
        let a = Arc::new(MockSource::new("A", 1).with_behavior(Behavior::Timeout));
        let b = Arc::new(MockSource::new("B", 2));
        let registry = registry(vec![a.clone(), b.clone()]);

        for _ in 0..3 {
            registry.fetch(&PriceRequest).await.unwrap();
        }
        assert_eq!(a.calls(), 3);

        let (result, diagnostics) = registry.fetch_with_diagnostics(&PriceRequest).await;
        assert!(result.is_ok());
        assert_eq!(a.calls(), 3);
        assert_eq!(
            diagnostics.skip_reasons()[0].1,
            &SkipReason::BackoffActive
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_operation_not_penalized() {
        let a = Arc::new(MockSource::new("A", 1).with_behavior(Behavior::NoMarket));
        let b = Arc::new(MockSource::new("B", 2));
        let registry = registry(vec![a.clone(), b.clone()]);

        let fetched = registry.fetch(&MarketRequest).await.unwrap();
        assert_eq!(fetched.source, "B");
        assert_eq!(registry.health().state("A").consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_source_is_penalized() {
        let a = Arc::new(MockSource::new("A", 1).with_behavior(Behavior::RateLimited));
        let b = Arc::new(MockSource::new("B", 2));
        let registry = registry(vec![a.clone(), b.clone()]);

        registry.fetch(&PriceRequest).await.unwrap();
        assert_eq!(registry.rate_limiter().remaining("A"), 0);
        assert_eq!(registry.health().state("A").consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_all_sources() {
        let a = Arc::new(MockSource::new("A", 1).with_behavior(Behavior::Timeout));
        let b = Arc::new(MockSource::new("B", 2).with_behavior(Behavior::Timeout));
        let registry = registry(vec![a, b]);

        let err = registry
            .fetch(&HistoryRequest(HistoryPeriod::Week))
            .await
            .unwrap_err();

        match err {
            MarketDataError::AllSourcesFailed { data_type, summary } => {
                assert_eq!(data_type, DataType::Historical);
                assert!(summary.contains("A: ERROR"));
                assert!(summary.contains("B: ERROR"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sources() {
        let registry = registry(Vec::new());
        let err = registry.fetch(&PriceRequest).await.unwrap_err();
        assert!(err.to_string().contains("no sources configured"));
    }
}
