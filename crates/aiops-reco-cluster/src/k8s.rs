//! Kubernetes context client.
//!
//! This module provides the [`ClusterClient`] capability and its
//! `KubeClusterClient` implementation, which reads pods, events and
//! container logs through the cluster API. Every call carries its own
//! timeout and never retries; retry policy belongs to the caller.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::Client;
use tracing::debug;

use aiops_reco_core::EventRecord;

use crate::pod::{event_record_from, pod_status_from};
use crate::types::{LogQuery, PodStatus};
use crate::{ClusterError, Result};

/// Read-only access to the cluster objects that describe an alerted pod.
///
/// Implementations hold no per-request state and are shared by all requests.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Get the current status of a pod.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::PodNotFound`] if the pod does not exist, or a
    /// transport/permission error if the lookup fails.
    async fn get_pod_status(&self, namespace: &str, pod: &str) -> Result<PodStatus>;

    /// List the events whose involved object is the given pod.
    ///
    /// The result is unordered and unbounded; ordering is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails.
    async fn list_events(&self, namespace: &str, pod: &str) -> Result<Vec<EventRecord>>;

    /// Fetch trailing log lines from a pod container.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::PodNotFound`] or
    /// [`ClusterError::LogsUnavailable`] when there is nothing to read, or a
    /// transport/permission error if the fetch fails.
    async fn get_logs(&self, namespace: &str, pod: &str, query: &LogQuery) -> Result<String>;
}

/// Kubernetes-backed [`ClusterClient`].
///
/// Wraps a shared `kube::Client`; cloning the underlying client is cheap and
/// reuses the same connection pool.
pub struct KubeClusterClient {
    client: Client,
    timeout: Duration,
}

impl KubeClusterClient {
    /// Create a new client.
    ///
    /// This will attempt to connect to the cluster using in-cluster config
    /// or kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes client cannot be created.
    pub async fn new(timeout: Duration) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, timeout })
    }

    /// Create a new client from a pre-configured `kube::Client`.
    #[must_use]
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn pods_api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn events_api(&self, namespace: &str) -> Api<Event> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Run one API call under the per-call timeout, mapping kube errors.
    async fn bounded<T, F>(&self, what: &str, object: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ClusterError::from_kube(e, object)),
            Err(_) => Err(ClusterError::Timeout(format!(
                "{what} {object} after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_pod_status(&self, namespace: &str, pod: &str) -> Result<PodStatus> {
        let object = format!("{namespace}/{pod}");
        let pods = self.pods_api(namespace);

        match self.bounded("get pod", &object, pods.get_opt(pod)).await? {
            Some(found) => {
                debug!(namespace, pod, "Fetched pod status");
                Ok(pod_status_from(&found))
            }
            None => Err(ClusterError::PodNotFound(object)),
        }
    }

    async fn list_events(&self, namespace: &str, pod: &str) -> Result<Vec<EventRecord>> {
        let object = format!("{namespace}/{pod}");
        let events = self.events_api(namespace);
        let params = ListParams::default()
            .fields(&format!("involvedObject.kind=Pod,involvedObject.name={pod}"));

        let list = self.bounded("list events", &object, events.list(&params)).await?;
        debug!(namespace, pod, count = list.items.len(), "Listed pod events");

        Ok(list.items.iter().map(event_record_from).collect())
    }

    async fn get_logs(&self, namespace: &str, pod: &str, query: &LogQuery) -> Result<String> {
        let object = format!("{namespace}/{pod}");
        let pods = self.pods_api(namespace);
        let params = LogParams {
            tail_lines: Some(i64::from(query.tail_lines)),
            previous: query.previous,
            container: query.container.clone(),
            ..Default::default()
        };

        match self.bounded("get logs", &object, pods.logs(pod, &params)).await {
            Ok(logs) => {
                debug!(
                    namespace,
                    pod,
                    previous = query.previous,
                    bytes = logs.len(),
                    "Fetched pod logs"
                );
                Ok(logs)
            }
            // The API server answers 400 when the requested instance has no logs,
            // e.g. `previous=true` on a container that never restarted.
            Err(ClusterError::KubeApi(kube::Error::Api(resp))) if resp.code == 400 => Err(
                ClusterError::LogsUnavailable(format!("{object}: {}", resp.message)),
            ),
            Err(e) => Err(e),
        }
    }
}

/// An in-memory cluster for testing without a real Kubernetes cluster.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// One recorded call against the mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ClusterCall {
        /// `get_pod_status(namespace, pod)`.
        PodStatus {
            /// Namespace.
            namespace: String,
            /// Pod.
            pod: String,
        },
        /// `list_events(namespace, pod)`.
        Events {
            /// Namespace.
            namespace: String,
            /// Pod.
            pod: String,
        },
        /// `get_logs(namespace, pod, query)`.
        Logs {
            /// Namespace.
            namespace: String,
            /// Pod.
            pod: String,
            /// Requested tail length.
            tail_lines: u32,
            /// Whether the previous instance was requested.
            previous: bool,
        },
    }

    /// Which operation a fault or delay applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Operation {
        /// Pod status lookups.
        PodStatus,
        /// Event listing.
        Events,
        /// Log fetches.
        Logs,
    }

    #[derive(Default)]
    struct MockPod {
        status: Option<PodStatus>,
        events: Vec<EventRecord>,
        current_logs: Option<String>,
        previous_logs: Option<String>,
    }

    #[derive(Default)]
    struct Inner {
        pods: HashMap<(String, String), MockPod>,
        failures: HashMap<Operation, String>,
        delays: HashMap<Operation, Duration>,
        calls: Vec<ClusterCall>,
    }

    /// A mock cluster that serves pods from memory and records every call.
    #[derive(Default)]
    pub struct MockClusterClient {
        inner: Mutex<Inner>,
    }

    impl MockClusterClient {
        /// Create a new, empty mock cluster.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add or replace a pod.
        pub fn insert_pod(&self, namespace: &str, pod: &str, status: PodStatus) {
            self.inner
                .lock()
                .pods
                .entry(key(namespace, pod))
                .or_default()
                .status = Some(status);
        }

        /// Set the events for a pod. Events for unknown pods are still served.
        pub fn set_events(&self, namespace: &str, pod: &str, events: Vec<EventRecord>) {
            self.inner
                .lock()
                .pods
                .entry(key(namespace, pod))
                .or_default()
                .events = events;
        }

        /// Set the current and previous container logs for a pod.
        pub fn set_logs(
            &self,
            namespace: &str,
            pod: &str,
            current: Option<&str>,
            previous: Option<&str>,
        ) {
            let mut inner = self.inner.lock();
            let entry = inner.pods.entry(key(namespace, pod)).or_default();
            entry.current_logs = current.map(str::to_string);
            entry.previous_logs = previous.map(str::to_string);
        }

        /// Remove a pod's status so lookups report it as not found.
        ///
        /// Events and logs already registered remain available.
        pub fn delete_pod(&self, namespace: &str, pod: &str) {
            if let Some(p) = self.inner.lock().pods.get_mut(&key(namespace, pod)) {
                p.status = None;
            }
        }

        /// Make every call of `op` fail with a server-side API error.
        pub fn fail(&self, op: Operation, message: &str) {
            self.inner.lock().failures.insert(op, message.to_string());
        }

        /// Delay every call of `op` by `delay`.
        pub fn delay(&self, op: Operation, delay: Duration) {
            self.inner.lock().delays.insert(op, delay);
        }

        /// All calls made so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<ClusterCall> {
            self.inner.lock().calls.clone()
        }

        /// Number of calls made so far.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.inner.lock().calls.len()
        }

        /// Record the call and return the configured delay and failure.
        fn enter(&self, call: ClusterCall, op: Operation) -> (Option<Duration>, Option<String>) {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            (
                inner.delays.get(&op).copied(),
                inner.failures.get(&op).cloned(),
            )
        }

        async fn gate(&self, call: ClusterCall, op: Operation) -> Result<()> {
            let (delay, failure) = self.enter(call, op);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(ClusterError::KubeApi(kube::Error::Api(
                    kube::error::ErrorResponse {
                        status: "Failure".to_string(),
                        message,
                        reason: "InternalError".to_string(),
                        code: 500,
                    },
                ))),
                None => Ok(()),
            }
        }
    }

    fn key(namespace: &str, pod: &str) -> (String, String) {
        (namespace.to_string(), pod.to_string())
    }

    #[async_trait]
    impl ClusterClient for MockClusterClient {
        async fn get_pod_status(&self, namespace: &str, pod: &str) -> Result<PodStatus> {
            let call = ClusterCall::PodStatus {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
            };
            self.gate(call, Operation::PodStatus).await?;

            let inner = self.inner.lock();
            inner
                .pods
                .get(&key(namespace, pod))
                .and_then(|p| p.status.clone())
                .ok_or_else(|| ClusterError::PodNotFound(format!("{namespace}/{pod}")))
        }

        async fn list_events(&self, namespace: &str, pod: &str) -> Result<Vec<EventRecord>> {
            let call = ClusterCall::Events {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
            };
            self.gate(call, Operation::Events).await?;

            Ok(self
                .inner
                .lock()
                .pods
                .get(&key(namespace, pod))
                .map(|p| p.events.clone())
                .unwrap_or_default())
        }

        async fn get_logs(&self, namespace: &str, pod: &str, query: &LogQuery) -> Result<String> {
            let call = ClusterCall::Logs {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
                tail_lines: query.tail_lines,
                previous: query.previous,
            };
            self.gate(call, Operation::Logs).await?;

            let inner = self.inner.lock();
            let logs = inner.pods.get(&key(namespace, pod)).and_then(|p| {
                if query.previous {
                    p.previous_logs.clone()
                } else {
                    p.current_logs.clone()
                }
            });
            logs.ok_or_else(|| ClusterError::LogsUnavailable(format!("{namespace}/{pod}")))
        }
    }
}
