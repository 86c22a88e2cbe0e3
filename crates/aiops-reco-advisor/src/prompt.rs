//! Prompt construction.
//!
//! The prompt is a fixed template over the alert and its cluster context.
//! Absent values render as an explicit marker so the model never assumes
//! evidence exists when it does not.

use std::fmt::Write as _;

use aiops_reco_core::{AlertRecord, ClusterContext, EventRecord};

/// System instructions sent with every model call.
pub const SYSTEM_INSTRUCTIONS: &str = "You are a Kubernetes SRE assistant. \
Provide safe, step-by-step troubleshooting guidance. \
No self-healing actions. \
Use the provided Kubernetes evidence (pod status/events/logs) to be specific. \
Include kubectl commands and what to validate in Prometheus/Grafana.";

/// Marker for a value that could not be obtained.
pub const NOT_AVAILABLE: &str = "(not available)";

/// Marker for a missing runbook match.
pub const NO_RUNBOOK: &str = "(no matching runbook snippet)";

/// The query used to look up a runbook chunk for `alert`.
#[must_use]
pub fn runbook_query(alert: &AlertRecord) -> String {
    [
        Some(alert.alertname.as_str()),
        alert.summary.as_deref(),
        alert.namespace.as_deref(),
        Some(alert.severity.as_str()),
        alert.pod.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Render the user prompt.
///
/// The output depends only on its arguments.
#[must_use]
pub fn build_prompt(alert: &AlertRecord, context: &ClusterContext, runbook: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str("Alert:\n");
    field(&mut out, "alertname", Some(&alert.alertname));
    field(&mut out, "severity", Some(&alert.severity));
    field(&mut out, "status", Some(alert.status.as_str()));
    field(&mut out, "namespace", alert.namespace.as_deref());
    field(&mut out, "pod", alert.pod.as_deref());
    field(&mut out, "deployment", alert.deployment.as_deref());
    field(&mut out, "summary", alert.summary.as_deref());

    out.push_str("\nKubernetes evidence (most important):\n");
    section(&mut out, "Pod summary", context.pod_summary.as_deref());

    out.push_str("\nRecent events (newest first):\n");
    if context.events.is_empty() {
        out.push_str(NOT_AVAILABLE);
        out.push('\n');
    } else {
        for event in &context.events {
            render_event(&mut out, event);
        }
    }

    out.push('\n');
    section(&mut out, "Log tail", context.logs_tail.as_deref());

    out.push('\n');
    out.push_str("Runbook context:\n");
    out.push_str(runbook.unwrap_or(NO_RUNBOOK));
    out.push('\n');

    out.push_str(
        "\nReturn:\n\
         1) Probable cause (based on evidence)\n\
         2) Immediate checks (commands)\n\
         3) Mitigation steps\n\
         4) What confirms recovery\n",
    );

    out
}

fn field(out: &mut String, name: &str, value: Option<&str>) {
    let _ = writeln!(out, "- {name}: {}", value.unwrap_or(NOT_AVAILABLE));
}

fn section(out: &mut String, title: &str, body: Option<&str>) {
    let _ = writeln!(out, "{title}:\n{}", body.unwrap_or(NOT_AVAILABLE));
}

fn render_event(out: &mut String, event: &EventRecord) {
    let seen = event
        .last_seen
        .map_or_else(|| "unknown time".to_string(), |t| t.to_rfc3339());
    let _ = writeln!(
        out,
        "- [{}] {} x{} (last seen {seen}): {}",
        event.event_type, event.reason, event.count, event.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiops_reco_core::AlertStatus;

    fn alert() -> AlertRecord {
        AlertRecord {
            alertname: "PodCrashLoop".to_string(),
            severity: "warning".to_string(),
            namespace: Some("ai-test".to_string()),
            pod: Some("badpod".to_string()),
            deployment: None,
            summary: Some("badpod is crashing".to_string()),
            status: AlertStatus::Firing,
        }
    }

    #[test]
    fn absent_fields_render_markers() {
        let prompt = build_prompt(&alert(), &ClusterContext::absent(), None);

        assert!(prompt.contains("- deployment: (not available)"));
        assert!(prompt.contains("Pod summary:\n(not available)"));
        assert!(prompt.contains("Recent events (newest first):\n(not available)"));
        assert!(prompt.contains("Log tail:\n(not available)"));
        assert!(prompt.contains("Runbook context:\n(no matching runbook snippet)"));
    }

    #[test]
    fn present_fields_are_rendered() {
        let context = ClusterContext {
            pod_summary: Some("phase=Running\nrestartCount=5".to_string()),
            events: vec![EventRecord {
                event_type: "Warning".to_string(),
                reason: "BackOff".to_string(),
                message: "Back-off restarting failed container".to_string(),
                count: 12,
                last_seen: None,
            }],
            logs_tail: Some("panic: config missing".to_string()),
        };

        let prompt = build_prompt(&alert(), &context, Some("Check the ConfigMap."));

        assert!(prompt.starts_with("Alert:\n- alertname: PodCrashLoop\n"));
        assert!(prompt.contains("- status: firing"));
        assert!(prompt.contains("Pod summary:\nphase=Running\nrestartCount=5"));
        assert!(prompt.contains(
            "- [Warning] BackOff x12 (last seen unknown time): Back-off restarting failed container"
        ));
        assert!(prompt.contains("Log tail:\npanic: config missing"));
        assert!(prompt.contains("Runbook context:\nCheck the ConfigMap."));
        assert!(prompt.ends_with("4) What confirms recovery\n"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let context = ClusterContext::absent();
        assert_eq!(
            build_prompt(&alert(), &context, None),
            build_prompt(&alert(), &context, None)
        );
    }

    #[test]
    fn runbook_query_skips_absent_fields() {
        let mut a = alert();
        assert_eq!(
            runbook_query(&a),
            "PodCrashLoop badpod is crashing ai-test warning badpod"
        );
        a.summary = None;
        a.pod = None;
        assert_eq!(runbook_query(&a), "PodCrashLoop ai-test warning");
    }
}
