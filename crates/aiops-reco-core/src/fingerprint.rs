//! Incident fingerprints.
//!
//! A fingerprint is the `(alertname, namespace, pod)` tuple that identifies
//! "the same incident" across a burst of alert deliveries.

use std::fmt;

/// Identity of an incident for de-duplication and log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextFingerprint {
    alertname: String,
    namespace: Option<String>,
    pod: Option<String>,
}

impl ContextFingerprint {
    /// Build a fingerprint from its parts.
    #[must_use]
    pub fn new(alertname: &str, namespace: Option<&str>, pod: Option<&str>) -> Self {
        Self {
            alertname: alertname.to_string(),
            namespace: namespace.map(str::to_string),
            pod: pod.map(str::to_string),
        }
    }

    /// Stable short digest, handy as a structured log field.
    ///
    /// Derived with blake3 over the length-prefixed parts, so `("a", "bc")`
    /// and `("ab", "c")` never collide.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            Some(self.alertname.as_str()),
            self.namespace.as_deref(),
            self.pod.as_deref(),
        ] {
            match part {
                Some(s) => {
                    hasher.update(&[1]);
                    hasher.update(&(s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        hex::encode(&hasher.finalize().as_bytes()[..8])
    }
}

impl fmt::Display for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.alertname,
            self.namespace.as_deref().unwrap_or("-"),
            self.pod.as_deref().unwrap_or("-")
        )
    }
}
