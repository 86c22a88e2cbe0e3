//! Kubernetes context lookups for aiops-reco.
//!
//! This crate provides the [`ClusterClient`] capability, its
//! [`KubeClusterClient`] implementation, and the [`ContextResolver`] that turns
//! an alert's pod identity into a bounded [`ClusterContext`](aiops_reco_core::ClusterContext).
//!
//! # Architecture
//!
//! ```text
//!                         AlertRecord
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ContextResolver                             │
//! │   ┌─────────────┐   ┌─────────────┐   ┌─────────────────────┐   │
//! │   │ Pod status  │──▶│  Log fetch  │   │   Event listing     │   │
//! │   │             │   │ (previous?) │   │  (ordered, top N)   │   │
//! │   └─────────────┘   └─────────────┘   └─────────────────────┘   │
//! │          shared deadline, failures isolated per branch           │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Kubernetes API Server                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use aiops_reco_cluster::{ContextResolver, KubeClusterClient, ResolverConfig};
//! use aiops_reco_core::normalize;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResolverConfig::from_env();
//! let client = KubeClusterClient::new(config.fetch_timeout).await?;
//! let resolver = ContextResolver::new(Arc::new(client), config);
//!
//! let payload = serde_json::json!({
//!     "status": "firing",
//!     "alerts": [{ "labels": { "alertname": "PodCrashLoop", "namespace": "ai-test", "pod": "badpod" } }]
//! });
//! let resolution = resolver.resolve(&normalize(&payload)).await;
//! println!("{:?}", resolution.context.pod_summary);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod k8s;
pub mod pod;
pub mod resolver;
pub mod types;

pub use error::{ClusterError, Result};
pub use k8s::{ClusterClient, KubeClusterClient};
pub use resolver::{ContextReport, ContextResolution, ContextResolver, LookupOutcome};
pub use types::{LogQuery, PodPhase, PodStatus, ResolverConfig};

#[cfg(any(test, feature = "test-utils"))]
pub use k8s::mock::{ClusterCall, MockClusterClient, Operation};
