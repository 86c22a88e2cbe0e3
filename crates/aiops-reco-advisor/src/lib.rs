//! Recommendation generation for aiops-reco.
//!
//! This crate turns an alert and its cluster context into remediation
//! guidance from a hosted language model, including:
//!
//! - Deterministic prompt construction with explicit "not available" markers
//! - Lexical runbook snippet retrieval
//! - Per-attempt timeouts, bounded retries with exponential backoff
//! - Degradation to a fixed placeholder instead of failing
//! - Optional de-duplication of identical incidents
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   Pipeline       │────▶│ RecommendationEngine │
//! │   (gateway)      │     │ prompt + retry loop  │
//! └──────────────────┘     └──────────┬───────────┘
//!                                     │
//!                 ┌───────────────────┼───────────────────┐
//!                 ▼                   ▼                   ▼
//!          ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//!          │ RunbookIndex│    │ InflightCache│    │ ModelProvider│
//!          └─────────────┘    └──────────────┘    │  (trait)     │
//!                                                 └──────┬───────┘
//!                                                        │ HTTPS
//!                                                 ┌──────▼───────┐
//!                                                 │ Responses API│
//!                                                 └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aiops_reco_advisor::{AdvisorConfig, OpenAiProvider, RecommendationEngine, RunbookIndex};
//! use aiops_reco_core::{AlertRecord, ClusterContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AdvisorConfig::from_env();
//! let runbooks = RunbookIndex::load(&config.runbooks_path)?;
//! let provider = Arc::new(OpenAiProvider::new(&config));
//! let engine = RecommendationEngine::new(provider, &config, runbooks);
//!
//! let result = engine
//!     .recommend(&AlertRecord::default(), &ClusterContext::absent())
//!     .await;
//! println!("degraded={} {}", result.degraded, result.text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod engine;
pub mod error;
pub mod inflight;
pub mod prompt;
pub mod provider;
pub mod runbook;

pub use engine::{RecommendationEngine, RetryPolicy};
pub use error::{ProviderError, Result};
pub use inflight::{Claim, InflightCache};
pub use provider::{CompletionRequest, ModelProvider, OpenAiProvider};
pub use runbook::RunbookIndex;

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockProvider;

/// Configuration for the recommendation engine and its provider.
#[derive(Clone)]
pub struct AdvisorConfig {
    /// Model identifier.
    pub model: String,
    /// Provider API key. Without one, every call degrades.
    pub api_key: Option<String>,
    /// Provider base URL (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Timeout for each model call attempt.
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each retry.
    pub retry_base_delay: Duration,
    /// Plain-text runbook file.
    pub runbooks_path: PathBuf,
    /// How long identical incidents share a result. Zero disables sharing.
    pub dedup_window: Duration,
}

impl AdvisorConfig {
    /// Get the Responses endpoint URL.
    #[must_use]
    pub fn responses_url(&self) -> String {
        format!("{}/v1/responses", self.base_url.trim_end_matches('/'))
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `OPENAI_MODEL`: Model identifier
    /// - `OPENAI_API_KEY`: Provider API key
    /// - `OPENAI_BASE_URL`: Provider base URL
    /// - `MODEL_TIMEOUT_SECONDS`: Per-attempt timeout
    /// - `MODEL_MAX_RETRIES`: Retries for transient failures
    /// - `MODEL_RETRY_BASE_DELAY_MS`: Initial retry backoff
    /// - `RUNBOOKS_PATH`: Runbook file
    /// - `DEDUP_WINDOW_SECONDS`: De-duplication window (0 disables)
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("OPENAI_MODEL") {
            if !val.trim().is_empty() {
                config.model = val;
            }
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if !val.trim().is_empty() {
                config.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            if !val.trim().is_empty() {
                config.base_url = val;
            }
        }
        if let Ok(val) = std::env::var("MODEL_TIMEOUT_SECONDS") {
            if let Ok(n) = val.parse() {
                config.timeout = Duration::from_secs(n);
            }
        }
        if let Ok(val) = std::env::var("MODEL_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                config.max_retries = n;
            }
        }
        if let Ok(val) = std::env::var("MODEL_RETRY_BASE_DELAY_MS") {
            if let Ok(n) = val.parse() {
                config.retry_base_delay = Duration::from_millis(n);
            }
        }
        if let Ok(val) = std::env::var("RUNBOOKS_PATH") {
            config.runbooks_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DEDUP_WINDOW_SECONDS") {
            if let Ok(n) = val.parse() {
                config.dedup_window = Duration::from_secs(n);
            }
        }

        config
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            runbooks_path: PathBuf::from("/data/runbooks.txt"),
            dedup_window: Duration::from_secs(60),
        }
    }
}

impl fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("runbooks_path", &self.runbooks_path)
            .field("dedup_window", &self.dedup_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AdvisorConfig::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_retries, 2);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn responses_url_tolerates_trailing_slash() {
        let config = AdvisorConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.responses_url(), "http://localhost:9000/v1/responses");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AdvisorConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
