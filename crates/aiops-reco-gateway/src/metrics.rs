//! Prometheus metrics for the service.
//!
//! Metrics live in a per-instance [`Registry`] so that every router built in
//! a test starts from zero.

use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

use aiops_reco_cluster::{ContextReport, LookupOutcome};

/// Latency buckets in seconds, sized for a pipeline dominated by the model call.
const LATENCY_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0,
];

/// Service metrics.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_latency_seconds: Histogram,
    recommendations_total: IntCounterVec,
    k8s_calls_total: IntCounterVec,
}

impl Metrics {
    /// Create and register all metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric definition is invalid.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("aiops_reco_requests_total", "Recommendation requests"),
            &["status"],
        )?;
        let request_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "aiops_reco_request_latency_seconds",
                "End-to-end recommendation latency",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let recommendations_total = IntCounterVec::new(
            Opts::new("aiops_reco_recommendations_total", "Recommendations by outcome"),
            &["status"],
        )?;
        let k8s_calls_total = IntCounterVec::new(
            Opts::new("aiops_reco_k8s_calls_total", "Kubernetes context lookups"),
            &["kind", "status"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency_seconds.clone()))?;
        registry.register(Box::new(recommendations_total.clone()))?;
        registry.register(Box::new(k8s_calls_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_latency_seconds,
            recommendations_total,
            k8s_calls_total,
        })
    }

    /// Count a finished request.
    pub fn record_request(&self, status: &str, elapsed: Duration) {
        self.requests_total.with_label_values(&[status]).inc();
        self.request_latency_seconds.observe(elapsed.as_secs_f64());
    }

    /// Count the cluster lookups of one resolution. Skipped lookups are not calls.
    pub fn record_context(&self, report: &ContextReport) {
        for (kind, outcome) in report.outcomes() {
            if outcome != LookupOutcome::Skipped {
                self.k8s_calls_total
                    .with_label_values(&[kind, outcome.as_str()])
                    .inc();
            }
        }
    }

    /// Count one recommendation by whether it degraded.
    pub fn record_recommendation(&self, degraded: bool) {
        let status = if degraded { "degraded" } else { "success" };
        self.recommendations_total.with_label_values(&[status]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
