//! aiops-reco gateway
//!
//! Main entry point for the recommendation service. Configuration comes from
//! the environment; see `GatewayConfig::from_env`, `ResolverConfig::from_env`
//! and `AdvisorConfig::from_env` for the variables.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aiops_reco_advisor::{AdvisorConfig, OpenAiProvider, RecommendationEngine, RunbookIndex};
use aiops_reco_cluster::{ContextResolver, KubeClusterClient, ResolverConfig};
use aiops_reco_gateway::{create_router, GatewayConfig, GatewayState, Metrics, Pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aiops_reco=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting aiops-reco gateway");

    let gateway_config = GatewayConfig::from_env();
    let resolver_config = ResolverConfig::from_env();
    let advisor_config = AdvisorConfig::from_env();

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        log_tail_lines = resolver_config.log_tail_lines,
        fetch_timeout_ms = u64::try_from(resolver_config.fetch_timeout.as_millis()).unwrap_or(u64::MAX),
        advisor = ?advisor_config,
        "Configuration loaded"
    );

    // ========================================================================
    // Cluster access
    // ========================================================================

    let cluster = Arc::new(KubeClusterClient::new(resolver_config.fetch_timeout).await?);
    tracing::info!("Kubernetes client initialized");

    // ========================================================================
    // Model access
    // ========================================================================

    if advisor_config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set - every recommendation will be the placeholder");
    }
    let provider = Arc::new(OpenAiProvider::new(&advisor_config));

    let runbooks = match RunbookIndex::load(&advisor_config.runbooks_path) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(
                path = %advisor_config.runbooks_path.display(),
                error = %e,
                "Failed to read runbooks - continuing without them"
            );
            RunbookIndex::empty()
        }
    };

    // ========================================================================
    // Pipeline and server
    // ========================================================================

    let pipeline = Pipeline::new(
        ContextResolver::new(cluster, resolver_config),
        RecommendationEngine::new(provider, &advisor_config, runbooks),
    );

    let budget = pipeline.budget();
    if gateway_config.request_timeout() < budget {
        tracing::warn!(
            request_timeout_seconds = gateway_config.request_timeout_seconds,
            pipeline_budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "REQUEST_TIMEOUT_SECONDS is shorter than the worst-case pipeline run; \
             slow requests may be cut off before degrading"
        );
    }

    let metrics = Arc::new(Metrics::new()?);
    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(Arc::new(pipeline), metrics, gateway_config);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
