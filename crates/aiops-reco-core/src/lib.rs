//! Core types for aiops-reco.
//!
//! This crate provides the request-scoped value objects that flow through the
//! recommendation pipeline:
//!
//! - **Alerts**: [`AlertRecord`] and the [`normalize`] boundary that turns an
//!   alert-dispatcher payload into one
//! - **Cluster context**: [`ClusterContext`] and [`EventRecord`] snapshots
//! - **Recommendations**: [`RecommendationResult`] with its degraded placeholder
//! - **Fingerprints**: [`ContextFingerprint`] identifying "the same incident"
//!
//! # Example
//!
//! ```
//! use aiops_reco_core::{normalize, AlertStatus};
//!
//! let payload = serde_json::json!({
//!     "status": "firing",
//!     "alerts": [{
//!         "labels": {"alertname": "PodCrashLoop", "namespace": "ai-test", "pod": "badpod"},
//!         "annotations": {"summary": "badpod is crashing"}
//!     }]
//! });
//!
//! let alert = normalize(&payload);
//! assert_eq!(alert.alertname, "PodCrashLoop");
//! assert_eq!(alert.status, AlertStatus::Firing);
//! assert_eq!(alert.pod_identity(), Some(("ai-test", "badpod")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alert;
pub mod context;
pub mod fingerprint;
pub mod recommendation;
pub mod text;

pub use alert::{normalize, AlertRecord, AlertStatus, UNKNOWN};
pub use context::{order_events, ClusterContext, EventRecord, MAX_EVENTS};
pub use fingerprint::ContextFingerprint;
pub use recommendation::{RecommendationResult, PLACEHOLDER_TEXT};
