//! Prometheus scrape endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use aiops_reco_advisor::ModelProvider;
use aiops_reco_cluster::ClusterClient;

use crate::error::ApiError;
use crate::state::GatewayState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// Render the service metrics in the Prometheus text format.
pub async fn metrics<C, P>(
    State(state): State<Arc<GatewayState<C, P>>>,
) -> Result<impl IntoResponse, ApiError>
where
    C: ClusterClient + 'static,
    P: ModelProvider + 'static,
{
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
