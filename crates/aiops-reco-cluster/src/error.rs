//! Error types for the cluster crate.

use thiserror::Error;

/// Errors that can occur during cluster lookups.
///
/// None of these are pipeline failures: the resolver turns every one of them
/// into an absent context field.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// Pod not found in the cluster.
    #[error("Pod not found: {0}")]
    PodNotFound(String),

    /// The requested container logs do not exist (e.g. no previous instance).
    #[error("Logs unavailable: {0}")]
    LogsUnavailable(String),

    /// The service account may not read the object.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The call did not complete within its timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    /// Map a kube error for the given object into the matching variant.
    ///
    /// 404 and 403 become [`PodNotFound`](Self::PodNotFound) and
    /// [`PermissionDenied`](Self::PermissionDenied); everything else stays a
    /// transport-level [`KubeApi`](Self::KubeApi) error.
    #[must_use]
    pub fn from_kube(err: kube::Error, object: &str) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::PodNotFound(object.to_string()),
            kube::Error::Api(resp) if resp.code == 403 => {
                Self::PermissionDenied(format!("{object}: {}", resp.message))
            }
            _ => Self::KubeApi(err),
        }
    }

    /// Whether the object simply does not exist.
    ///
    /// Pods are frequently gone by the time an alert is processed, so this is
    /// an expected outcome rather than a fault.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::PodNotFound(_) | Self::LogsUnavailable(_))
    }
}

/// A specialized Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {code}"),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn from_kube_maps_status_codes() {
        assert!(matches!(
            ClusterError::from_kube(api_error(404), "ns/pod"),
            ClusterError::PodNotFound(ref p) if p == "ns/pod"
        ));
        assert!(matches!(
            ClusterError::from_kube(api_error(403), "ns/pod"),
            ClusterError::PermissionDenied(_)
        ));
        assert!(matches!(
            ClusterError::from_kube(api_error(500), "ns/pod"),
            ClusterError::KubeApi(_)
        ));
    }

    #[test]
    fn not_found_classification() {
        assert!(ClusterError::PodNotFound("p".into()).is_not_found());
        assert!(ClusterError::LogsUnavailable("p".into()).is_not_found());
        assert!(!ClusterError::Timeout("p".into()).is_not_found());
        assert!(!ClusterError::PermissionDenied("p".into()).is_not_found());
    }
}
