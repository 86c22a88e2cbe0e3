//! Recommendation results.

use serde::{Deserialize, Serialize};

/// Text returned when the model provider produced nothing usable.
pub const PLACEHOLDER_TEXT: &str = "(No recommendation returned)";

/// Outcome of a recommendation attempt.
///
/// `text` is never empty: a degraded result carries [`PLACEHOLDER_TEXT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Remediation guidance, or the placeholder.
    pub text: String,
    /// Whether this is the placeholder rather than model output.
    pub degraded: bool,
}

impl RecommendationResult {
    /// Wrap model output. Blank output degrades to the placeholder.
    #[must_use]
    pub fn generated(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::degraded()
        } else {
            Self {
                text,
                degraded: false,
            }
        }
    }

    /// The placeholder result.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            text: PLACEHOLDER_TEXT.to_string(),
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keeps_text() {
        let result = RecommendationResult::generated("Restart the pod");
        assert_eq!(result.text, "Restart the pod");
        assert!(!result.degraded);
    }

    #[test]
    fn blank_output_degrades() {
        let result = RecommendationResult::generated("  \n ");
        assert_eq!(result, RecommendationResult::degraded());
        assert_eq!(result.text, PLACEHOLDER_TEXT);
    }
}
