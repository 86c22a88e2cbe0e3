//! Conversion from Kubernetes objects into triage snapshots.
//!
//! This module reduces raw `Pod` and `Event` objects to the small, bounded
//! shapes the pipeline works with, and renders the condensed pod summary
//! that ends up in the response and the prompt.

use std::fmt::Write as _;

use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateTerminated, ContainerStatus, Event, Pod,
};

use aiops_reco_core::text::truncate_chars;
use aiops_reco_core::EventRecord;

use crate::types::{ContainerSnapshot, PodPhase, PodStatus, TerminatedState, WaitingState};

/// Maximum length of the rendered pod summary.
pub const MAX_SUMMARY_CHARS: usize = 2000;

/// Maximum length of a single event message.
pub const MAX_EVENT_MESSAGE_CHARS: usize = 300;

/// Maximum length of a container waiting message inside the summary.
const MAX_WAITING_MESSAGE_CHARS: usize = 200;

/// Extract a [`PodStatus`] snapshot from a Kubernetes pod.
#[must_use]
pub fn pod_status_from(pod: &Pod) -> PodStatus {
    let status = pod.status.as_ref();

    let phase = status
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::from_k8s_phase)
        .unwrap_or_default();

    let ready = status
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });

    let containers = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| statuses.iter().map(container_snapshot).collect())
        .unwrap_or_default();

    PodStatus {
        phase,
        ready,
        reason: status.and_then(|s| s.reason.clone()),
        message: status.and_then(|s| s.message.clone()),
        containers,
    }
}

fn container_snapshot(cs: &ContainerStatus) -> ContainerSnapshot {
    ContainerSnapshot {
        name: cs.name.clone(),
        ready: cs.ready,
        restart_count: cs.restart_count.unsigned_abs(),
        waiting: cs.state.as_ref().and_then(waiting_state),
        terminated: cs
            .state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .map(terminated_state),
        last_terminated: cs
            .last_state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .map(terminated_state),
    }
}

fn waiting_state(state: &ContainerState) -> Option<WaitingState> {
    state.waiting.as_ref().map(|w| WaitingState {
        reason: w.reason.clone(),
        message: w.message.clone(),
    })
}

fn terminated_state(t: &ContainerStateTerminated) -> TerminatedState {
    TerminatedState {
        reason: t.reason.clone(),
        exit_code: t.exit_code,
        finished_at: t.finished_at.as_ref().map(|time| time.0),
    }
}

/// Convert a Kubernetes event into an [`EventRecord`].
///
/// `last_seen` prefers `lastTimestamp`, then the series' last observation,
/// then `eventTime`, then `firstTimestamp`; newer event producers only fill
/// some of these.
#[must_use]
pub fn event_record_from(event: &Event) -> EventRecord {
    let series = event.series.as_ref();

    let last_seen = event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| series.and_then(|s| s.last_observed_time.as_ref()).map(|t| t.0))
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.first_timestamp.as_ref().map(|t| t.0));

    let count = event
        .count
        .or_else(|| series.and_then(|s| s.count))
        .map_or(1, i32::unsigned_abs);

    EventRecord {
        event_type: event.type_.clone().unwrap_or_default(),
        reason: event.reason.clone().unwrap_or_default(),
        message: truncate_chars(
            event.message.as_deref().unwrap_or_default(),
            MAX_EVENT_MESSAGE_CHARS,
        ),
        count,
        last_seen,
    }
}

/// Render the condensed, deterministic pod summary.
#[must_use]
pub fn render_summary(status: &PodStatus) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "phase={}", status.phase.as_k8s_phase());
    let _ = writeln!(out, "ready={}", status.ready);
    let _ = writeln!(out, "restartCount={}", status.restart_count());
    if let Some(reason) = &status.reason {
        let _ = writeln!(out, "reason={reason}");
    }
    if let Some(message) = &status.message {
        let _ = writeln!(out, "message={}", truncate_chars(message, MAX_WAITING_MESSAGE_CHARS));
    }

    for c in &status.containers {
        let _ = writeln!(
            out,
            "container={} ready={} restartCount={}",
            c.name, c.ready, c.restart_count
        );
        if let Some(w) = &c.waiting {
            let _ = writeln!(
                out,
                "state.waiting.reason={}",
                w.reason.as_deref().unwrap_or_default()
            );
            let _ = writeln!(
                out,
                "state.waiting.message={}",
                truncate_chars(
                    w.message.as_deref().unwrap_or_default(),
                    MAX_WAITING_MESSAGE_CHARS
                )
            );
        }
        if let Some(t) = &c.terminated {
            write_termination(&mut out, "state.terminated", t);
        }
        if let Some(t) = &c.last_terminated {
            write_termination(&mut out, "last.terminated", t);
        }
    }

    truncate_chars(out.trim_end(), MAX_SUMMARY_CHARS)
}

fn write_termination(out: &mut String, prefix: &str, t: &TerminatedState) {
    let _ = writeln!(
        out,
        "{prefix}.reason={}",
        t.reason.as_deref().unwrap_or_default()
    );
    let _ = writeln!(out, "{prefix}.exitCode={}", t.exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ContainerStateWaiting, PodCondition};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use chrono::{TimeZone, Utc};

    fn crash_looping_pod() -> Pod {
        let status = k8s_openapi::api::core::v1::PodStatus {
            phase: Some("Running".to_string()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: "False".to_string(),
                ..Default::default()
            }]),
            container_statuses: Some(vec![ContainerStatus {
                name: "app".to_string(),
                ready: false,
                restart_count: 5,
                state: Some(ContainerState {
                    waiting: Some(ContainerStateWaiting {
                        reason: Some("CrashLoopBackOff".to_string()),
                        message: Some("back-off 5m0s restarting failed container".to_string()),
                    }),
                    ..Default::default()
                }),
                last_state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: 1,
                        reason: Some("Error".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        Pod {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn pod_status_from_crash_looping_pod() {
        let status = pod_status_from(&crash_looping_pod());

        assert_eq!(status.phase, PodPhase::Running);
        assert!(!status.ready);
        assert_eq!(status.restart_count(), 5);

        let c = &status.containers[0];
        assert_eq!(c.name, "app");
        assert_eq!(
            c.waiting.as_ref().and_then(|w| w.reason.as_deref()),
            Some("CrashLoopBackOff")
        );
        assert_eq!(c.last_terminated.as_ref().map(|t| t.exit_code), Some(1));
        assert!(c.terminated.is_none());
    }

    #[test]
    fn pod_status_from_empty_pod() {
        let status = pod_status_from(&Pod::default());
        assert_eq!(status, PodStatus::default());
    }

    #[test]
    fn render_summary_lists_container_state() {
        let summary = render_summary(&pod_status_from(&crash_looping_pod()));

        assert_eq!(
            summary,
            "phase=Running\n\
             ready=false\n\
             restartCount=5\n\
             container=app ready=false restartCount=5\n\
             state.waiting.reason=CrashLoopBackOff\n\
             state.waiting.message=back-off 5m0s restarting failed container\n\
             last.terminated.reason=Error\n\
             last.terminated.exitCode=1"
        );
    }

    #[test]
    fn render_summary_is_bounded() {
        let status = PodStatus {
            containers: (0..200)
                .map(|i| ContainerSnapshot {
                    name: format!("sidecar-with-a-long-name-{i}"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        assert!(render_summary(&status).chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[test]
    fn event_record_prefers_last_timestamp() {
        let last = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let first = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = Event {
            type_: Some("Warning".to_string()),
            reason: Some("BackOff".to_string()),
            message: Some("m".repeat(1_000)),
            count: Some(12),
            last_timestamp: Some(Time(last)),
            first_timestamp: Some(Time(first)),
            ..Default::default()
        };

        let record = event_record_from(&event);
        assert_eq!(record.event_type, "Warning");
        assert_eq!(record.reason, "BackOff");
        assert_eq!(record.count, 12);
        assert_eq!(record.last_seen, Some(last));
        assert_eq!(record.message.chars().count(), MAX_EVENT_MESSAGE_CHARS);
    }

    #[test]
    fn event_record_defaults() {
        let record = event_record_from(&Event::default());
        assert_eq!(record.count, 1);
        assert_eq!(record.last_seen, None);
        assert!(record.reason.is_empty());
    }
}
