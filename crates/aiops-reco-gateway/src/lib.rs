//! HTTP entry point for the aiops-reco recommendation service.
//!
//! This crate exposes the recommendation pipeline over HTTP. It handles:
//!
//! - Accepting alert-group payloads on `POST /recommend`
//! - Orchestrating context resolution and recommendation generation
//! - Liveness and Prometheus endpoints
//!
//! Every request that carries parseable JSON gets a `200` with the same
//! three keys; cluster and model failures show up as `null` fields and a
//! placeholder recommendation, never as error statuses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Alerting workflow (webhook)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ POST /recommend
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     aiops-reco-gateway                      │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Router    │ │  Pipeline   │ │      Metrics        │   │
//! │  │ + Handlers  │ │ orchestrate │ │   (Prometheus)      │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!      ┌─────────────────┐          ┌──────────────────────┐
//!      │ ContextResolver │          │ RecommendationEngine │
//!      │   (cluster)     │          │       (model)        │
//!      └─────────────────┘          └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aiops_reco_gateway::{create_router, GatewayConfig, GatewayState, Metrics, Pipeline};
//! use aiops_reco_advisor::{AdvisorConfig, OpenAiProvider, RecommendationEngine, RunbookIndex};
//! use aiops_reco_cluster::{ContextResolver, KubeClusterClient, ResolverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver_config = ResolverConfig::from_env();
//! let cluster = Arc::new(KubeClusterClient::new(resolver_config.fetch_timeout).await?);
//! let advisor_config = AdvisorConfig::from_env();
//! let provider = Arc::new(OpenAiProvider::new(&advisor_config));
//!
//! let pipeline = Pipeline::new(
//!     ContextResolver::new(cluster, resolver_config),
//!     RecommendationEngine::new(provider, &advisor_config, RunbookIndex::empty()),
//! );
//!
//! let config = GatewayConfig::default();
//! let state = GatewayState::new(Arc::new(pipeline), Arc::new(Metrics::new()?), config);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use metrics::Metrics;
pub use pipeline::{Pipeline, PipelineRun, RecommendResponse};
pub use routes::create_router;
pub use state::GatewayState;
