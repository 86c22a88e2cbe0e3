//! Context resolution for an alerted pod.
//!
//! The [`ContextResolver`] fans out the three cluster lookups for one alert,
//! isolates their failures from one another, and folds the results into a
//! bounded [`ClusterContext`]. All three branches share a single deadline, so
//! resolution never takes longer than one fetch timeout.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{FutureExt, Shared};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use aiops_reco_core::text::{tail_chars, tail_lines};
use aiops_reco_core::{order_events, AlertRecord, ClusterContext, EventRecord};

use crate::k8s::ClusterClient;
use crate::pod::render_summary;
use crate::types::{LogQuery, PodStatus, ResolverConfig};
use crate::ClusterError;

/// Maximum length of the log tail kept in a context.
pub const MAX_LOG_CHARS: usize = 4000;

/// What happened to one cluster lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The alert had no pod identity, or the lookup was moot.
    Skipped,
    /// Data was returned.
    Found,
    /// The call succeeded but returned nothing useful.
    Empty,
    /// The object does not exist.
    NotFound,
    /// Transport failure, permission denied, or timeout.
    Failed,
}

impl LookupOutcome {
    /// Stable lowercase label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Found => "found",
            Self::Empty => "empty",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        }
    }

    fn from_error(err: &ClusterError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Failed
        }
    }
}

/// Per-branch outcomes of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextReport {
    /// Pod status lookup.
    pub pod_status: LookupOutcome,
    /// Event listing.
    pub events: LookupOutcome,
    /// Log fetch.
    pub logs: LookupOutcome,
    /// Whether the pod was judged to be crash-looping.
    pub crash_looping: bool,
    /// Whether `logs_tail` came from the previous container instance.
    pub previous_logs: bool,
}

impl ContextReport {
    fn skipped() -> Self {
        Self {
            pod_status: LookupOutcome::Skipped,
            events: LookupOutcome::Skipped,
            logs: LookupOutcome::Skipped,
            crash_looping: false,
            previous_logs: false,
        }
    }

    /// Whether any branch ran into a missing object.
    #[must_use]
    pub fn hit_not_found(&self) -> bool {
        [self.pod_status, self.events, self.logs].contains(&LookupOutcome::NotFound)
    }

    /// Whether no cluster call was attempted.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.pod_status == LookupOutcome::Skipped
            && self.events == LookupOutcome::Skipped
            && self.logs == LookupOutcome::Skipped
    }

    /// `(kind, outcome)` pairs for every branch.
    #[must_use]
    pub fn outcomes(&self) -> [(&'static str, LookupOutcome); 3] {
        [
            ("pod", self.pod_status),
            ("events", self.events),
            ("logs", self.logs),
        ]
    }
}

/// A resolved context together with how it was obtained.
#[derive(Debug, Clone)]
pub struct ContextResolution {
    /// The context to hand to the recommendation step.
    pub context: ClusterContext,
    /// Per-branch outcomes.
    pub report: ContextReport,
}

/// Identity fields carried on every log line of a resolution.
struct Target<'a> {
    namespace: &'a str,
    pod: &'a str,
    alertname: &'a str,
}

#[derive(Clone)]
struct PodLookup {
    status: Option<PodStatus>,
    outcome: LookupOutcome,
}

struct EventsLookup {
    events: Vec<EventRecord>,
    outcome: LookupOutcome,
}

struct LogsLookup {
    tail: Option<String>,
    outcome: LookupOutcome,
    previous: bool,
}

impl LogsLookup {
    const fn without(outcome: LookupOutcome) -> Self {
        Self {
            tail: None,
            outcome,
            previous: false,
        }
    }
}

/// Builds a [`ClusterContext`] for an alert.
pub struct ContextResolver<C: ClusterClient> {
    client: Arc<C>,
    config: ResolverConfig,
}

impl<C: ClusterClient> ContextResolver<C> {
    /// Create a new resolver.
    #[must_use]
    pub fn new(client: Arc<C>, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the context for `alert`.
    ///
    /// Never fails: every lookup error becomes an absent field.
    pub async fn resolve(&self, alert: &AlertRecord) -> ContextResolution {
        self.resolve_at(alert, Utc::now()).await
    }

    /// Resolve the context, judging crash loops as of `now`.
    pub async fn resolve_at(&self, alert: &AlertRecord, now: DateTime<Utc>) -> ContextResolution {
        let Some((namespace, pod)) = alert.pod_identity() else {
            debug!(
                alertname = %alert.alertname,
                "Alert has no pod identity, skipping cluster lookups"
            );
            return ContextResolution {
                context: ClusterContext::absent(),
                report: ContextReport::skipped(),
            };
        };

        let target = Target {
            namespace,
            pod,
            alertname: &alert.alertname,
        };
        let deadline = Instant::now() + self.config.fetch_timeout;

        let pod_lookup = self.lookup_pod(&target, deadline).shared();
        let (pod_lookup, events, logs) = tokio::join!(
            pod_lookup.clone(),
            self.lookup_events(&target, deadline),
            self.lookup_logs(&target, pod_lookup.clone(), now, deadline),
        );

        let crash_looping = pod_lookup
            .status
            .as_ref()
            .is_some_and(|s| s.is_crash_looping(now, self.config.crash_recency));

        ContextResolution {
            context: ClusterContext {
                pod_summary: pod_lookup.status.as_ref().map(render_summary),
                events: events.events,
                logs_tail: logs.tail,
            },
            report: ContextReport {
                pod_status: pod_lookup.outcome,
                events: events.outcome,
                logs: logs.outcome,
                crash_looping,
                previous_logs: logs.previous,
            },
        }
    }

    async fn lookup_pod(&self, target: &Target<'_>, deadline: Instant) -> PodLookup {
        let call = self.client.get_pod_status(target.namespace, target.pod);

        match timeout_at(deadline, call).await {
            Ok(Ok(status)) => PodLookup {
                status: Some(status),
                outcome: LookupOutcome::Found,
            },
            Ok(Err(e)) => {
                warn!(
                    namespace = %target.namespace,
                    pod = %target.pod,
                    alertname = %target.alertname,
                    error = %e,
                    "Pod status lookup failed"
                );
                PodLookup {
                    status: None,
                    outcome: LookupOutcome::from_error(&e),
                }
            }
            Err(_) => {
                warn!(
                    namespace = %target.namespace,
                    pod = %target.pod,
                    alertname = %target.alertname,
                    "Pod status lookup timed out"
                );
                PodLookup {
                    status: None,
                    outcome: LookupOutcome::Failed,
                }
            }
        }
    }

    async fn lookup_events(&self, target: &Target<'_>, deadline: Instant) -> EventsLookup {
        let call = self.client.list_events(target.namespace, target.pod);

        match timeout_at(deadline, call).await {
            Ok(Ok(mut events)) => {
                order_events(&mut events, self.config.event_limit());
                let outcome = if events.is_empty() {
                    LookupOutcome::Empty
                } else {
                    LookupOutcome::Found
                };
                EventsLookup { events, outcome }
            }
            Ok(Err(e)) => {
                warn!(
                    namespace = %target.namespace,
                    pod = %target.pod,
                    alertname = %target.alertname,
                    error = %e,
                    "Event listing failed"
                );
                EventsLookup {
                    events: Vec::new(),
                    outcome: LookupOutcome::from_error(&e),
                }
            }
            Err(_) => {
                warn!(
                    namespace = %target.namespace,
                    pod = %target.pod,
                    alertname = %target.alertname,
                    "Event listing timed out"
                );
                EventsLookup {
                    events: Vec::new(),
                    outcome: LookupOutcome::Failed,
                }
            }
        }
    }

    /// Fetch logs once the pod status tells us which instance to read.
    ///
    /// A crash-looping container is read from its previous instance, falling
    /// back to the current one when that yields nothing. A pod that does not
    /// exist has no logs, so no call is made.
    async fn lookup_logs<F>(
        &self,
        target: &Target<'_>,
        pod_lookup: Shared<F>,
        now: DateTime<Utc>,
        deadline: Instant,
    ) -> LogsLookup
    where
        F: Future<Output = PodLookup>,
    {
        let fetch = async {
            let pod = pod_lookup.await;
            if pod.outcome == LookupOutcome::NotFound {
                return LogsLookup::without(LookupOutcome::NotFound);
            }

            let crashing = pod
                .status
                .as_ref()
                .and_then(|s| s.crash_looping_container(now, self.config.crash_recency));

            if let Some(container) = crashing {
                match self.fetch_logs(target, true, Some(&container.name)).await {
                    Ok(Some(tail)) => {
                        return LogsLookup {
                            tail: Some(tail),
                            outcome: LookupOutcome::Found,
                            previous: true,
                        };
                    }
                    Ok(None) => debug!(
                        namespace = %target.namespace,
                        pod = %target.pod,
                        container = %container.name,
                        "Previous instance logs empty, reading current instance"
                    ),
                    Err(e) => debug!(
                        namespace = %target.namespace,
                        pod = %target.pod,
                        container = %container.name,
                        error = %e,
                        "Previous instance logs unavailable, reading current instance"
                    ),
                }
            }

            let container =
                crashing.or_else(|| pod.status.as_ref().and_then(|s| s.containers.first()));
            match self
                .fetch_logs(target, false, container.map(|c| c.name.as_str()))
                .await
            {
                Ok(Some(tail)) => LogsLookup {
                    tail: Some(tail),
                    outcome: LookupOutcome::Found,
                    previous: false,
                },
                Ok(None) => LogsLookup::without(LookupOutcome::Empty),
                Err(e) => {
                    warn!(
                        namespace = %target.namespace,
                        pod = %target.pod,
                        alertname = %target.alertname,
                        error = %e,
                        "Log fetch failed"
                    );
                    LogsLookup::without(LookupOutcome::from_error(&e))
                }
            }
        };

        if let Ok(logs) = timeout_at(deadline, fetch).await {
            logs
        } else {
            warn!(
                namespace = %target.namespace,
                pod = %target.pod,
                alertname = %target.alertname,
                "Log fetch timed out"
            );
            LogsLookup::without(LookupOutcome::Failed)
        }
    }

    /// One log call, reduced to a bounded tail. Blank output is `None`.
    async fn fetch_logs(
        &self,
        target: &Target<'_>,
        previous: bool,
        container: Option<&str>,
    ) -> crate::Result<Option<String>> {
        let query = LogQuery {
            tail_lines: self.config.log_tail_lines,
            previous,
            container: container.map(str::to_string),
        };
        let raw = self
            .client
            .get_logs(target.namespace, target.pod, &query)
            .await?;

        let lines = usize::try_from(self.config.log_tail_lines).unwrap_or(usize::MAX);
        let tail = tail_chars(&tail_lines(&raw, lines), MAX_LOG_CHARS);
        Ok((!tail.trim().is_empty()).then_some(tail))
    }
}
