//! Alert records and payload normalization.
//!
//! The alert dispatcher posts an alert *group*: a top-level status plus an
//! ordered list of alert entries, each carrying free-form `labels` and
//! `annotations` maps. [`normalize`] converts that loosely-shaped JSON into a
//! strongly-typed [`AlertRecord`] right at the boundary. It never fails:
//! missing or mistyped fields fall back to defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::fingerprint::ContextFingerprint;
use crate::text::truncate_chars;

/// Placeholder used for required string fields that the payload did not carry.
pub const UNKNOWN: &str = "unknown";

/// Maximum length of the human summary kept on the record.
const MAX_SUMMARY_CHARS: usize = 500;

/// Maximum length of a label value kept on the record (the Kubernetes name limit).
const MAX_LABEL_CHARS: usize = 253;

const NAMESPACE_KEYS: &[&str] = &["namespace", "kubernetes_namespace"];
const POD_KEYS: &[&str] = &["pod", "pod_name"];
const DEPLOYMENT_KEYS: &[&str] = &["deployment", "kubernetes_deployment"];
const SUMMARY_KEYS: &[&str] = &["summary", "description"];

/// Lifecycle status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// The alert condition is active.
    Firing,
    /// The alert condition has cleared.
    Resolved,
    /// The payload did not say.
    #[default]
    Unknown,
}

impl AlertStatus {
    /// Parse a dispatcher status string. Anything unrecognised maps to `Unknown`.
    #[must_use]
    pub fn from_dispatch_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "firing" => Self::Firing,
            "resolved" => Self::Resolved,
            _ => Self::Unknown,
        }
    }

    /// Lowercase wire spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Firing => "firing",
            Self::Resolved => "resolved",
            Self::Unknown => "unknown",
        }
    }
}

/// Canonical representation of one firing or resolved alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Alert rule name, `"unknown"` when absent.
    pub alertname: String,
    /// Severity label, `"unknown"` when absent.
    pub severity: String,
    /// Namespace of the affected workload, if any.
    pub namespace: Option<String>,
    /// Affected pod, if any.
    pub pod: Option<String>,
    /// Owning deployment, if any.
    pub deployment: Option<String>,
    /// Human-readable summary annotation.
    pub summary: Option<String>,
    /// Firing or resolved.
    pub status: AlertStatus,
}

impl Default for AlertRecord {
    fn default() -> Self {
        Self {
            alertname: UNKNOWN.to_string(),
            severity: UNKNOWN.to_string(),
            namespace: None,
            pod: None,
            deployment: None,
            summary: None,
            status: AlertStatus::Unknown,
        }
    }
}

impl AlertRecord {
    /// The `(namespace, pod)` pair, only when both are known.
    ///
    /// Cluster-wide and synthetic alerts carry no pod identity; callers use
    /// this to decide whether any cluster lookup makes sense at all.
    #[must_use]
    pub fn pod_identity(&self) -> Option<(&str, &str)> {
        match (self.namespace.as_deref(), self.pod.as_deref()) {
            (Some(namespace), Some(pod)) => Some((namespace, pod)),
            _ => None,
        }
    }

    /// Fingerprint identifying this incident for de-duplication.
    #[must_use]
    pub fn fingerprint(&self) -> ContextFingerprint {
        ContextFingerprint::new(
            &self.alertname,
            self.namespace.as_deref(),
            self.pod.as_deref(),
        )
    }
}

/// Normalize an alert-dispatcher payload into a single [`AlertRecord`].
///
/// The first alert entry is the representative record; the group is assumed
/// homogeneous. Malformed shapes are logged at warning level and produce a
/// maximally-defaulted record instead of an error.
#[must_use]
pub fn normalize(payload: &Value) -> AlertRecord {
    let Some(root) = payload.as_object() else {
        warn!(
            payload_type = json_type(payload),
            "Alert payload is not a JSON object, using defaults"
        );
        return AlertRecord::default();
    };

    let group_status = root
        .get("status")
        .and_then(Value::as_str)
        .map(AlertStatus::from_dispatch_status)
        .unwrap_or_default();

    let first = match root.get("alerts") {
        Some(Value::Array(alerts)) => alerts.first(),
        None | Some(Value::Null) => None,
        Some(other) => {
            warn!(
                alerts_type = json_type(other),
                "Alert payload `alerts` is not an array, using defaults"
            );
            None
        }
    };

    let Some(entry) = first else {
        warn!(status = ?group_status, "Alert payload carries no alert entries");
        return AlertRecord {
            status: group_status,
            ..AlertRecord::default()
        };
    };

    let Some(entry) = entry.as_object() else {
        warn!(
            entry_type = json_type(entry),
            "First alert entry is not an object, using defaults"
        );
        return AlertRecord {
            status: group_status,
            ..AlertRecord::default()
        };
    };

    let labels = string_map(entry, "labels");
    let annotations = string_map(entry, "annotations");

    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .map(AlertStatus::from_dispatch_status)
        .filter(|s| *s != AlertStatus::Unknown)
        .unwrap_or(group_status);

    AlertRecord {
        alertname: lookup(labels, &["alertname"], MAX_LABEL_CHARS)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        severity: lookup(labels, &["severity"], MAX_LABEL_CHARS)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        namespace: lookup(labels, NAMESPACE_KEYS, MAX_LABEL_CHARS),
        pod: lookup(labels, POD_KEYS, MAX_LABEL_CHARS),
        deployment: lookup(labels, DEPLOYMENT_KEYS, MAX_LABEL_CHARS),
        summary: lookup(annotations, SUMMARY_KEYS, MAX_SUMMARY_CHARS),
        status,
    }
}

/// Fetch a nested object, warning when the key exists with the wrong shape.
fn string_map<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match entry.get(key) {
        Some(Value::Object(map)) => Some(map),
        None | Some(Value::Null) => None,
        Some(other) => {
            warn!(
                key,
                value_type = json_type(other),
                "Alert entry field is not an object, ignoring it"
            );
            None
        }
    }
}

/// First non-empty value among `keys`, in order.
fn lookup(map: Option<&Map<String, Value>>, keys: &[&str], max_chars: usize) -> Option<String> {
    let map = map?;
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| truncate_chars(trimmed, max_chars))
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
