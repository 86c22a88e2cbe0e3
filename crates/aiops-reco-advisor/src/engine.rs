//! The recommendation engine.
//!
//! Builds the prompt, calls the model provider under a per-attempt timeout,
//! retries transient failures with exponential backoff, and degrades to a
//! placeholder when no usable text comes back. It never fails.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use aiops_reco_core::{AlertRecord, ClusterContext, RecommendationResult};

use crate::error::ProviderError;
use crate::inflight::{Claim, InflightCache};
use crate::prompt::{build_prompt, runbook_query, SYSTEM_INSTRUCTIONS};
use crate::provider::{CompletionRequest, ModelProvider};
use crate::runbook::{RunbookIndex, MAX_RUNBOOK_CHARS};
use crate::AdvisorConfig;

/// Timeout and retry settings for model calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Timeout for each attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Take the policy from the advisor configuration.
    #[must_use]
    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Longest a recommendation can take: every attempt timing out plus
    /// every backoff.
    #[must_use]
    pub fn worst_case(&self) -> Duration {
        (0..self.max_retries).fold(
            self.timeout.saturating_mul(self.max_retries.saturating_add(1)),
            |total, attempt| total.saturating_add(self.backoff(attempt)),
        )
    }
}

/// Produces a [`RecommendationResult`] for an alert and its context.
pub struct RecommendationEngine<P: ModelProvider> {
    provider: Arc<P>,
    policy: RetryPolicy,
    runbooks: RunbookIndex,
    inflight: Option<InflightCache>,
}

impl<P: ModelProvider + 'static> RecommendationEngine<P> {
    /// Create an engine.
    ///
    /// De-duplication is enabled when `config.dedup_window` is non-zero.
    #[must_use]
    pub fn new(provider: Arc<P>, config: &AdvisorConfig, runbooks: RunbookIndex) -> Self {
        let inflight =
            (!config.dedup_window.is_zero()).then(|| InflightCache::new(config.dedup_window));

        Self {
            provider,
            policy: RetryPolicy::from_config(config),
            runbooks,
            inflight,
        }
    }

    /// Get the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the provider request for an alert.
    #[must_use]
    pub fn request_for(&self, alert: &AlertRecord, context: &ClusterContext) -> CompletionRequest {
        let runbook = self
            .runbooks
            .retrieve(&runbook_query(alert), MAX_RUNBOOK_CHARS);

        CompletionRequest {
            instructions: SYSTEM_INSTRUCTIONS.to_string(),
            input: build_prompt(alert, context, runbook.as_deref()),
        }
    }

    /// Generate a recommendation.
    ///
    /// Identical incidents within the de-duplication window share one model
    /// call. The returned text is never empty.
    pub async fn recommend(
        &self,
        alert: &AlertRecord,
        context: &ClusterContext,
    ) -> RecommendationResult {
        let fingerprint = alert.fingerprint();
        let call = generate(
            Arc::clone(&self.provider),
            self.request_for(alert, context),
            self.policy.clone(),
            fingerprint.to_string(),
        );

        let Some(cache) = &self.inflight else {
            return call.await;
        };

        let (shared, claim) = cache.claim(&fingerprint, move || call.boxed());
        if claim == Claim::Joined {
            debug!(fingerprint = %fingerprint, "Joined in-flight recommendation");
        }
        shared.await
    }
}

/// Call the provider with timeout and bounded retries.
async fn generate<P: ModelProvider>(
    provider: Arc<P>,
    request: CompletionRequest,
    policy: RetryPolicy,
    fingerprint: String,
) -> RecommendationResult {
    let mut attempt = 0u32;

    loop {
        let outcome = tokio::time::timeout(policy.timeout, provider.complete(&request))
            .await
            .unwrap_or(Err(ProviderError::Timeout));

        match outcome {
            Ok(text) => {
                let result = RecommendationResult::generated(text);
                if result.degraded {
                    warn!(fingerprint = %fingerprint, "Model returned blank output");
                }
                return result;
            }
            Err(e) if e.is_retriable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                warn!(
                    fingerprint = %fingerprint,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Model call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint,
                    attempts = attempt + 1,
                    retries_exhausted = e.is_retriable(),
                    error_kind = e.kind(),
                    error = %e,
                    "Model call failed, returning placeholder"
                );
                return RecommendationResult::degraded();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use aiops_reco_core::{AlertStatus, PLACEHOLDER_TEXT};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn alert(pod: &str) -> AlertRecord {
        AlertRecord {
            alertname: "PodCrashLoop".to_string(),
            severity: "warning".to_string(),
            namespace: Some("ai-test".to_string()),
            pod: Some(pod.to_string()),
            deployment: None,
            summary: Some("badpod is crashing".to_string()),
            status: AlertStatus::Firing,
        }
    }

    fn config(dedup_secs: u64) -> AdvisorConfig {
        AdvisorConfig {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            dedup_window: Duration::from_secs(dedup_secs),
            ..Default::default()
        }
    }

    fn engine(provider: &Arc<MockProvider>, dedup_secs: u64) -> RecommendationEngine<MockProvider> {
        RecommendationEngine::new(
            Arc::clone(provider),
            &config(dedup_secs),
            RunbookIndex::empty(),
        )
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::from_config(&config(0));
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.worst_case(), Duration::from_millis(31_500));
    }

    #[tokio::test]
    async fn returns_model_text() {
        let provider = Arc::new(MockProvider::replying("1) Probable cause: bad config"));
        let result = engine(&provider, 0)
            .recommend(&alert("badpod"), &ClusterContext::absent())
            .await;

        assert_eq!(result.text, "1) Probable cause: bad config");
        assert!(!result.degraded);

        let request = provider.last_request().unwrap();
        assert_eq!(request.instructions, SYSTEM_INSTRUCTIONS);
        assert!(request.input.contains("- pod: badpod"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_exhaust_retries_then_degrade() {
        let provider = Arc::new(MockProvider::hanging());
        let start = Instant::now();

        let result = engine(&provider, 0)
            .recommend(&alert("badpod"), &ClusterContext::absent())
            .await;

        assert!(result.degraded);
        assert_eq!(result.text, PLACEHOLDER_TEXT);
        assert_eq!(provider.calls(), 3);
        // three 10s attempts plus 0.5s and 1s of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(31_500));
        assert!(elapsed < Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_is_retried() {
        let provider = Arc::new(MockProvider::replying("recovered"));
        provider.push(Err(ProviderError::RateLimited));
        provider.push(Err(ProviderError::Server {
            status: 502,
            message: "bad gateway".into(),
        }));

        let result = engine(&provider, 0)
            .recommend(&alert("badpod"), &ClusterContext::absent())
            .await;

        assert_eq!(result.text, "recovered");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn empty_or_rejected_response_is_not_retried() {
        for error in [
            ProviderError::Empty,
            ProviderError::Rejected {
                status: 400,
                message: "unknown model".into(),
            },
        ] {
            let provider = Arc::new(MockProvider::replying("never reached"));
            provider.push(Err(error));

            let result = engine(&provider, 0)
                .recommend(&alert("badpod"), &ClusterContext::absent())
                .await;

            assert!(result.degraded);
            assert_eq!(provider.calls(), 1);
        }
    }

    #[tokio::test]
    async fn blank_text_degrades() {
        let provider = Arc::new(MockProvider::replying("   \n"));
        let result = engine(&provider, 0)
            .recommend(&alert("badpod"), &ClusterContext::absent())
            .await;

        assert!(result.degraded);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_alerts_share_one_call() {
        let provider = Arc::new(
            MockProvider::replying("shared answer").with_delay(Duration::from_secs(1)),
        );
        let engine = engine(&provider, 60);
        let context = ClusterContext::absent();
        let badpod = alert("badpod");
        let otherpod = alert("otherpod");

        let (a, b, c) = tokio::join!(
            engine.recommend(&badpod, &context),
            engine.recommend(&badpod, &context),
            engine.recommend(&otherpod, &context),
        );

        assert_eq!(a.text, "shared answer");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn runbook_snippet_reaches_prompt() {
        let provider = Arc::new(MockProvider::replying("ok"));
        let runbooks = RunbookIndex::from_text(
            "PodCrashLoop: inspect kubectl logs --previous.\n\nDiskPressure: prune images.",
        );
        let engine = RecommendationEngine::new(Arc::clone(&provider), &config(0), runbooks);

        engine
            .recommend(&alert("badpod"), &ClusterContext::absent())
            .await;

        let input = provider.last_request().unwrap().input;
        assert!(input.contains("Runbook context:\nPodCrashLoop: inspect kubectl logs --previous."));
    }

    /// A provider whose calls never finish and report when they are dropped.
    struct StallingProvider {
        started: AtomicU32,
        dropped: Arc<AtomicU32>,
    }

    struct CallGuard(Arc<AtomicU32>);

    impl Drop for CallGuard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl ModelProvider for StallingProvider {
        async fn complete(&self, _request: &CompletionRequest) -> crate::Result<String> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = CallGuard(Arc::clone(&self.dropped));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_drops_model_call() {
        let provider = Arc::new(StallingProvider {
            started: AtomicU32::new(0),
            dropped: Arc::new(AtomicU32::new(0)),
        });
        let engine = RecommendationEngine::new(
            Arc::clone(&provider),
            &config(60),
            RunbookIndex::empty(),
        );
        let badpod = alert("badpod");
        let context = ClusterContext::absent();

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), engine.recommend(&badpod, &context)).await;
        assert!(cancelled.is_err());
        assert_eq!(provider.started.load(Ordering::SeqCst), 1);
        assert_eq!(provider.dropped.load(Ordering::SeqCst), 1);

        let again =
            tokio::time::timeout(Duration::from_secs(1), engine.recommend(&badpod, &context)).await;
        assert!(again.is_err());
        assert_eq!(provider.started.load(Ordering::SeqCst), 2);
    }
}
