//! Types for the cluster crate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aiops_reco_core::MAX_EVENTS;

/// Waiting reason Kubernetes reports for a container stuck restarting.
pub const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";

/// Point-in-time status of a pod, reduced to what matters for triage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    /// Current phase of the pod lifecycle.
    pub phase: PodPhase,
    /// Whether the pod's `Ready` condition is true.
    pub ready: bool,
    /// Pod-level status reason (`Evicted`, `NodeLost`, ...).
    pub reason: Option<String>,
    /// Pod-level status message.
    pub message: Option<String>,
    /// Per-container state, in the order the pod declares them.
    pub containers: Vec<ContainerSnapshot>,
}

impl PodStatus {
    /// Total restarts across all containers.
    #[must_use]
    pub fn restart_count(&self) -> u32 {
        self.containers.iter().map(|c| c.restart_count).sum()
    }

    /// The first container that looks crash-looping at `now`, if any.
    ///
    /// A container is crash-looping when it is waiting in `CrashLoopBackOff`,
    /// or when it has restarted and its last termination was a non-zero exit
    /// that finished within `recency` of `now`.
    #[must_use]
    pub fn crash_looping_container(
        &self,
        now: DateTime<Utc>,
        recency: Duration,
    ) -> Option<&ContainerSnapshot> {
        self.containers
            .iter()
            .find(|c| c.is_crash_looping(now, recency))
    }

    /// Whether any container is crash-looping at `now`.
    #[must_use]
    pub fn is_crash_looping(&self, now: DateTime<Utc>, recency: Duration) -> bool {
        self.crash_looping_container(now, recency).is_some()
    }
}

/// State of one container within a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Container name.
    pub name: String,
    /// Whether the container passes its readiness probe.
    pub ready: bool,
    /// Restarts of this container.
    pub restart_count: u32,
    /// Present while the container is waiting to (re)start.
    pub waiting: Option<WaitingState>,
    /// Present when the current instance has terminated.
    pub terminated: Option<TerminatedState>,
    /// The previous instance's termination, if it had one.
    pub last_terminated: Option<TerminatedState>,
}

impl ContainerSnapshot {
    fn is_crash_looping(&self, now: DateTime<Utc>, recency: Duration) -> bool {
        let backing_off = self
            .waiting
            .as_ref()
            .and_then(|w| w.reason.as_deref())
            .is_some_and(|reason| reason == CRASH_LOOP_REASON);

        if backing_off {
            return true;
        }

        self.restart_count > 0
            && self
                .last_terminated
                .as_ref()
                .is_some_and(|t| t.exit_code != 0 && t.finished_within(now, recency))
    }
}

/// Waiting state details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingState {
    /// Reason (`CrashLoopBackOff`, `ImagePullBackOff`, ...).
    pub reason: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

/// Terminated state details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatedState {
    /// Reason (`Error`, `OOMKilled`, `Completed`, ...).
    pub reason: Option<String>,
    /// Process exit code.
    pub exit_code: i32,
    /// When the instance finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TerminatedState {
    /// Unknown finish times count as recent.
    fn finished_within(&self, now: DateTime<Utc>, recency: Duration) -> bool {
        let Some(finished_at) = self.finished_at else {
            return true;
        };
        chrono::Duration::from_std(recency)
            .map_or(true, |window| now.signed_duration_since(finished_at) <= window)
    }
}

/// Phase of the pod lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PodPhase {
    /// Pod has been accepted but containers are not yet running.
    Pending,
    /// Pod is running with at least one container.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// At least one container failed.
    Failed,
    /// Pod status cannot be determined.
    #[default]
    Unknown,
}

impl PodPhase {
    /// Parse a pod phase from a Kubernetes phase string.
    #[must_use]
    pub fn from_k8s_phase(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// The Kubernetes spelling of this phase.
    #[must_use]
    pub const fn as_k8s_phase(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

/// Parameters for a container log fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Number of trailing lines to return.
    pub tail_lines: u32,
    /// Read the previous terminated instance instead of the current one.
    pub previous: bool,
    /// Container to read; `None` lets the API server pick the only container.
    pub container: Option<String>,
}

/// Configuration for the context resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Trailing log lines to fetch.
    pub log_tail_lines: u32,
    /// Budget for each cluster call and for the resolution as a whole.
    pub fetch_timeout: Duration,
    /// Maximum events kept in a context. Never above [`MAX_EVENTS`].
    pub max_events: usize,
    /// How recent a non-zero exit must be to count as crash-looping.
    pub crash_recency: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            log_tail_lines: 50,
            fetch_timeout: Duration::from_secs(5),
            max_events: MAX_EVENTS,
            crash_recency: Duration::from_secs(15 * 60),
        }
    }
}

impl ResolverConfig {
    /// Events kept per context after clamping to [`MAX_EVENTS`].
    #[must_use]
    pub fn event_limit(&self) -> usize {
        self.max_events.min(MAX_EVENTS)
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `LOG_TAIL_LINES`: Trailing log lines to fetch
    /// - `CONTEXT_FETCH_TIMEOUT_SECONDS`: Per-call and overall context budget
    /// - `MAX_EVENTS`: Maximum events kept per context, at most 6
    /// - `CRASH_RECENCY_SECONDS`: Window for treating a non-zero exit as a crash loop
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LOG_TAIL_LINES") {
            if let Ok(n) = val.parse() {
                config.log_tail_lines = n;
            }
        }
        if let Ok(val) = std::env::var("CONTEXT_FETCH_TIMEOUT_SECONDS") {
            if let Ok(n) = val.parse() {
                config.fetch_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(val) = std::env::var("MAX_EVENTS") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_events = n.min(MAX_EVENTS);
            }
        }
        if let Ok(val) = std::env::var("CRASH_RECENCY_SECONDS") {
            if let Ok(n) = val.parse() {
                config.crash_recency = Duration::from_secs(n);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn container(restarts: u32) -> ContainerSnapshot {
        ContainerSnapshot {
            name: "app".to_string(),
            restart_count: restarts,
            ..Default::default()
        }
    }

    #[test]
    fn pod_phase_from_k8s() {
        assert_eq!(PodPhase::from_k8s_phase("Pending"), PodPhase::Pending);
        assert_eq!(PodPhase::from_k8s_phase("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from_k8s_phase("Succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from_k8s_phase("Failed"), PodPhase::Failed);
        assert_eq!(PodPhase::from_k8s_phase("Invalid"), PodPhase::Unknown);
        assert_eq!(PodPhase::Running.as_k8s_phase(), "Running");
    }

    #[test]
    fn crash_loop_from_waiting_reason() {
        let mut c = container(5);
        c.waiting = Some(WaitingState {
            reason: Some(CRASH_LOOP_REASON.to_string()),
            message: None,
        });
        let status = PodStatus {
            containers: vec![container(0), c],
            ..Default::default()
        };

        let window = Duration::from_secs(900);
        assert!(status.is_crash_looping(now(), window));
        assert_eq!(status.restart_count(), 5);
    }

    #[test]
    fn crash_loop_from_recent_non_zero_exit() {
        let mut c = container(2);
        c.last_terminated = Some(TerminatedState {
            reason: Some("Error".to_string()),
            exit_code: 137,
            finished_at: Some(now() - chrono::Duration::minutes(3)),
        });
        let status = PodStatus {
            containers: vec![c],
            ..Default::default()
        };

        assert!(status.is_crash_looping(now(), Duration::from_secs(900)));
        assert!(!status.is_crash_looping(now(), Duration::from_secs(60)));
    }

    #[test]
    fn clean_exit_or_no_restarts_is_not_crash_loop() {
        let mut clean = container(3);
        clean.last_terminated = Some(TerminatedState {
            reason: Some("Completed".to_string()),
            exit_code: 0,
            finished_at: None,
        });
        let mut never_restarted = container(0);
        never_restarted.last_terminated = Some(TerminatedState {
            exit_code: 1,
            ..Default::default()
        });

        let status = PodStatus {
            containers: vec![clean, never_restarted],
            ..Default::default()
        };
        assert!(!status.is_crash_looping(now(), Duration::from_secs(900)));
    }

    #[test]
    fn resolver_config_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.log_tail_lines, 50);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.max_events, 6);
    }

    #[test]
    fn event_limit_never_exceeds_six() {
        std::env::set_var("MAX_EVENTS", "10");
        let from_env = ResolverConfig::from_env();
        std::env::remove_var("MAX_EVENTS");
        assert_eq!(from_env.max_events, MAX_EVENTS);

        let literal = ResolverConfig {
            max_events: 10,
            ..Default::default()
        };
        assert_eq!(literal.event_limit(), MAX_EVENTS);

        let smaller = ResolverConfig {
            max_events: 2,
            ..Default::default()
        };
        assert_eq!(smaller.event_limit(), 2);
    }
}
