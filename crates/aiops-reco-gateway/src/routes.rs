//! Router configuration.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use aiops_reco_advisor::ModelProvider;
use aiops_reco_cluster::ClusterClient;

use crate::handlers::{health, metrics, recommend};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `POST /recommend` - Alert in, context and recommendation out
/// - `GET /health`, `GET /healthz` - Liveness
/// - `GET /metrics` - Prometheus scrape
pub fn create_router<C, P>(state: GatewayState<C, P>) -> Router
where
    C: ClusterClient + 'static,
    P: ModelProvider + 'static,
{
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    Router::new()
        .route("/recommend", post(recommend::recommend::<C, P>))
        .route("/health", get(health::health))
        .route("/healthz", get(health::health))
        .route("/metrics", get(metrics::metrics::<C, P>))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use aiops_reco_advisor::{AdvisorConfig, MockProvider, RecommendationEngine, RunbookIndex};
    use aiops_reco_cluster::{ContextResolver, MockClusterClient, ResolverConfig};

    use crate::config::GatewayConfig;
    use crate::metrics::Metrics;
    use crate::pipeline::Pipeline;

    fn router(config: GatewayConfig) -> Router {
        let advisor = AdvisorConfig {
            timeout: Duration::from_secs(1),
            dedup_window: Duration::ZERO,
            ..Default::default()
        };
        let pipeline = Pipeline::new(
            ContextResolver::new(Arc::new(MockClusterClient::new()), ResolverConfig::default()),
            RecommendationEngine::new(
                Arc::new(MockProvider::replying("advice")),
                &advisor,
                RunbookIndex::empty(),
            ),
        );
        let metrics = Metrics::new().unwrap();
        create_router(GatewayState::new(
            Arc::new(pipeline),
            Arc::new(metrics),
            config,
        ))
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = router(GatewayConfig::default())
            .oneshot(Request::get("/v1/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recommend_requires_post() {
        let response = router(GatewayConfig::default())
            .oneshot(Request::get("/recommend").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = GatewayConfig {
            max_body_bytes: 64,
            ..Default::default()
        };
        let body = format!(r#"{{"alerts":[],"padding":"{}"}}"#, "x".repeat(256));
        let response = router(config)
            .oneshot(
                Request::post("/recommend")
                    .header("content-type", "application/json")
                    .header("content-length", body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
