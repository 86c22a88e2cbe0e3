//! The recommendation pipeline.
//!
//! normalize → resolve context → recommend → compose. Every step degrades
//! instead of failing, so the composed response always carries the same
//! three keys.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use aiops_reco_advisor::{ModelProvider, RecommendationEngine};
use aiops_reco_cluster::{ClusterClient, ContextReport, ContextResolver};
use aiops_reco_core::{normalize, AlertRecord, ClusterContext, RecommendationResult};

/// Body of a `/recommend` response.
///
/// Downstream workflows template on `alert.*`, `k8s_context.*` and
/// `recommendation`; these keys must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// The normalized alert.
    pub alert: AlertRecord,
    /// Cluster evidence, with absent fields as `null`.
    pub k8s_context: ClusterContext,
    /// Model guidance, or the placeholder.
    pub recommendation: String,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The response to return.
    pub response: RecommendResponse,
    /// How the context lookups went.
    pub report: ContextReport,
    /// Whether the recommendation is the placeholder.
    pub degraded: bool,
}

/// Orchestrates one recommendation request.
pub struct Pipeline<C: ClusterClient, P: ModelProvider> {
    resolver: ContextResolver<C>,
    engine: RecommendationEngine<P>,
}

impl<C, P> Pipeline<C, P>
where
    C: ClusterClient,
    P: ModelProvider + 'static,
{
    /// Create a pipeline.
    #[must_use]
    pub fn new(resolver: ContextResolver<C>, engine: RecommendationEngine<P>) -> Self {
        Self { resolver, engine }
    }

    /// Longest a run can take: the context budget plus the worst-case model budget.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.resolver.config().fetch_timeout + self.engine.policy().worst_case()
    }

    /// Run the pipeline on a raw alert-group payload.
    pub async fn handle(&self, payload: &Value) -> PipelineRun {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        let alert = normalize(payload);
        let resolution = self.resolver.resolve(&alert).await;
        let RecommendationResult { text, degraded } =
            self.engine.recommend(&alert, &resolution.context).await;

        let report = resolution.report;
        info!(
            request_id = %request_id,
            alertname = %alert.alertname,
            namespace = alert.namespace.as_deref().unwrap_or("-"),
            pod = alert.pod.as_deref().unwrap_or("-"),
            fingerprint = %alert.fingerprint().digest(),
            pod_status = report.pod_status.as_str(),
            events = report.events.as_str(),
            logs = report.logs.as_str(),
            previous_logs = report.previous_logs,
            context_not_found = report.hit_not_found(),
            degraded,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Recommendation request handled"
        );

        PipelineRun {
            response: RecommendResponse {
                alert,
                k8s_context: resolution.context,
                recommendation: text,
            },
            report,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aiops_reco_advisor::{AdvisorConfig, MockProvider, RunbookIndex};
    use aiops_reco_cluster::{MockClusterClient, PodPhase, PodStatus, ResolverConfig};
    use aiops_reco_core::PLACEHOLDER_TEXT;
    use serde_json::json;

    fn pipeline(
        cluster: &Arc<MockClusterClient>,
        provider: &Arc<MockProvider>,
    ) -> Pipeline<MockClusterClient, MockProvider> {
        let config = AdvisorConfig {
            timeout: Duration::from_secs(1),
            max_retries: 0,
            dedup_window: Duration::ZERO,
            ..Default::default()
        };
        Pipeline::new(
            ContextResolver::new(Arc::clone(cluster), ResolverConfig::default()),
            RecommendationEngine::new(Arc::clone(provider), &config, RunbookIndex::empty()),
        )
    }

    #[tokio::test]
    async fn empty_alert_group_yields_defaults() {
        let cluster = Arc::new(MockClusterClient::new());
        let provider = Arc::new(MockProvider::replying("generic advice"));

        let run = pipeline(&cluster, &provider)
            .handle(&json!({ "status": "firing", "alerts": [] }))
            .await;

        assert_eq!(run.response.alert.alertname, "unknown");
        assert_eq!(run.response.alert.severity, "unknown");
        assert!(run.response.k8s_context.is_empty());
        assert!(run.report.is_skipped());
        assert_eq!(run.response.recommendation, "generic advice");
        assert_eq!(cluster.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_timeout_degrades_to_placeholder() {
        let cluster = Arc::new(MockClusterClient::new());
        cluster.insert_pod(
            "ns",
            "web",
            PodStatus {
                phase: PodPhase::Running,
                ready: true,
                ..Default::default()
            },
        );
        let provider = Arc::new(MockProvider::hanging());

        let run = pipeline(&cluster, &provider)
            .handle(&json!({
                "status": "firing",
                "alerts": [{ "labels": { "alertname": "HighLatency", "namespace": "ns", "pod": "web" } }]
            }))
            .await;

        assert!(run.degraded);
        assert_eq!(run.response.recommendation, PLACEHOLDER_TEXT);
        assert!(run.response.k8s_context.pod_summary.is_some());
    }

    #[test]
    fn response_serializes_three_keys() {
        let response = RecommendResponse {
            alert: AlertRecord::default(),
            k8s_context: ClusterContext::absent(),
            recommendation: PLACEHOLDER_TEXT.to_string(),
        };

        let value = serde_json::to_value(&response).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 3);
        assert!(value["k8s_context"]["pod_summary"].is_null());
        assert!(value["k8s_context"]["logs_tail"].is_null());
        assert_eq!(value["k8s_context"]["events"], json!([]));
    }
}
