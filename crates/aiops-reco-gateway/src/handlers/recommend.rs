//! The `/recommend` endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::warn;

use aiops_reco_advisor::ModelProvider;
use aiops_reco_cluster::ClusterClient;

use crate::error::ApiError;
use crate::pipeline::RecommendResponse;
use crate::state::GatewayState;

/// Produce a recommendation for an alert-group payload.
///
/// Any JSON body is accepted; missing alert fields are defaulted. Only an
/// invalid content type or unparseable JSON is rejected.
///
/// # Example
///
/// ```text
/// POST /recommend
/// {"status":"firing","alerts":[{"labels":{"alertname":"PodCrashLoop","namespace":"ai-test","pod":"badpod"}}]}
///
/// Response: 200 OK
/// {
///   "alert": {"alertname": "PodCrashLoop", ...},
///   "k8s_context": {"pod_summary": "...", "events": [...], "logs_tail": "..."},
///   "recommendation": "1) Probable cause ..."
/// }
/// ```
pub async fn recommend<C, P>(
    State(state): State<Arc<GatewayState<C, P>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError>
where
    C: ClusterClient + 'static,
    P: ModelProvider + 'static,
{
    let started = Instant::now();

    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected unparseable recommend request");
            state.metrics.record_request("bad_request", started.elapsed());
            return Err(rejection.into());
        }
    };

    let run = state.pipeline.handle(&payload).await;

    state.metrics.record_context(&run.report);
    state.metrics.record_recommendation(run.degraded);
    state.metrics.record_request("ok", started.elapsed());

    Ok(Json(run.response))
}
