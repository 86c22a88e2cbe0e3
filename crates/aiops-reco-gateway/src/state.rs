//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use aiops_reco_advisor::ModelProvider;
use aiops_reco_cluster::ClusterClient;

use crate::config::GatewayConfig;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;

/// Shared application state for the gateway.
///
/// The pipeline's clients are long-lived connection pools shared by every
/// request; nothing here is mutated per request except metric counters.
pub struct GatewayState<C, P>
where
    C: ClusterClient,
    P: ModelProvider,
{
    /// The recommendation pipeline.
    pub pipeline: Arc<Pipeline<C, P>>,
    /// Service metrics.
    pub metrics: Arc<Metrics>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C, P> GatewayState<C, P>
where
    C: ClusterClient,
    P: ModelProvider,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline<C, P>>, metrics: Arc<Metrics>, config: GatewayConfig) -> Self {
        Self {
            pipeline,
            metrics,
            config,
        }
    }
}

impl<C, P> Clone for GatewayState<C, P>
where
    C: ClusterClient,
    P: ModelProvider,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            metrics: Arc::clone(&self.metrics),
            config: self.config.clone(),
        }
    }
}
