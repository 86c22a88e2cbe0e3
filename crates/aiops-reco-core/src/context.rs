//! Cluster context snapshots used to ground a recommendation.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on the number of events kept in a context.
pub const MAX_EVENTS: usize = 6;

/// A single cluster event concerning the alerted pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event type (`Normal`, `Warning`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Machine-readable reason (`BackOff`, `FailedScheduling`, ...).
    pub reason: String,
    /// Human-readable message, already length-capped.
    pub message: String,
    /// How many times the event was observed.
    pub count: u32,
    /// When the event was last observed.
    pub last_seen: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// Ordering that puts the newest, most frequent events first.
    ///
    /// Events without a timestamp sort after every timestamped event.
    #[must_use]
    pub fn relevance_cmp(&self, other: &Self) -> Ordering {
        other
            .last_seen
            .cmp(&self.last_seen)
            .then_with(|| other.count.cmp(&self.count))
    }
}

/// Sort events by `(last_seen desc, count desc)` and keep at most `limit`.
pub fn order_events(events: &mut Vec<EventRecord>, limit: usize) {
    events.sort_by(EventRecord::relevance_cmp);
    events.truncate(limit);
}

/// Operational snapshot of the alerted pod.
///
/// Every field may be absent: the pod can be gone, have no events, or the
/// log fetch can be denied. Absent fields serialize as `null` (or `[]`), so the
/// JSON keys are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterContext {
    /// Condensed pod status.
    pub pod_summary: Option<String>,
    /// Most relevant recent events, newest first.
    pub events: Vec<EventRecord>,
    /// Trailing container log lines.
    pub logs_tail: Option<String>,
}

impl ClusterContext {
    /// A context with every field absent.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Whether no context could be gathered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pod_summary.is_none() && self.events.is_empty() && self.logs_tail.is_none()
    }
}
