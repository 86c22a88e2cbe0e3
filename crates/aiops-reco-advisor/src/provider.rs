//! Language-model provider client.
//!
//! [`ModelProvider`] is the seam between the recommendation engine and the
//! hosted model. [`OpenAiProvider`] talks to an OpenAI-compatible Responses
//! endpoint; a scripted `MockProvider` is available for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aiops_reco_core::text::truncate_chars;

use crate::error::{ProviderError, Result};
use crate::AdvisorConfig;

/// Maximum length of a provider error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// System instructions.
    pub instructions: String,
    /// User input (the rendered prompt).
    pub input: String,
}

/// A text-completion capability.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce text for `request`.
    ///
    /// Implementations make exactly one attempt; retries and timeouts are the
    /// engine's concern.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] describing why no text was produced.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Request body of the Responses API.
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

/// The subset of a Responses API reply we read.
#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesReply {
    /// Concatenated `output_text` parts of every message item.
    fn text(self) -> String {
        if let Some(text) = self.output_text {
            return text;
        }
        self.output
            .into_iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect()
    }
}

/// Error body shape shared by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible Responses endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider from the advisor configuration.
    ///
    /// The HTTP client's own timeout is the model timeout, so a hung
    /// connection is abandoned even outside the engine.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: &AdvisorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            url: config.responses_url(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// The model identifier sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Turn a non-success response into an error.
    async fn error_from(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorReply>(&body)
            .map_or_else(|_| body, |reply| reply.error.message);
        let message = truncate_chars(&message, MAX_ERROR_BODY_CHARS);

        match status {
            429 => ProviderError::RateLimited,
            500..=599 => ProviderError::Server { status, message },
            _ => ProviderError::Rejected { status, message },
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let body = ResponsesRequest {
            model: &self.model,
            instructions: &request.instructions,
            input: &request.input,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let reply: ResponsesReply = response.json().await?;
        let text = reply.text();

        if text.trim().is_empty() {
            return Err(ProviderError::Empty);
        }

        debug!(model = %self.model, chars = text.len(), "Model call succeeded");
        Ok(text)
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// A scripted model provider for testing.
    ///
    /// Queued results are returned first, in order; once the queue is empty
    /// every call returns the fallback reply, or a transport error if there
    /// is none. An optional delay runs before each call.
    #[derive(Default)]
    pub struct MockProvider {
        queue: Mutex<VecDeque<Result<String>>>,
        fallback: Option<String>,
        delay: Option<Duration>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockProvider {
        /// A provider that always answers `text`.
        #[must_use]
        pub fn replying(text: &str) -> Self {
            Self {
                fallback: Some(text.to_string()),
                ..Default::default()
            }
        }

        /// A provider that never answers in any reasonable time.
        #[must_use]
        pub fn hanging() -> Self {
            Self::default().with_delay(Duration::from_secs(3600))
        }

        /// Delay every call by `delay`.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Queue a result for the next unscripted call.
        pub fn push(&self, result: Result<String>) {
            self.queue.lock().push_back(result);
        }

        /// Number of calls made so far.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.requests.lock().len()
        }

        /// The most recent request, if any.
        #[must_use]
        pub fn last_request(&self) -> Option<CompletionRequest> {
            self.requests.lock().last().cloned()
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().push(request.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let queued = self.queue.lock().pop_front();
            match queued {
                Some(result) => result,
                None => self
                    .fallback
                    .clone()
                    .ok_or_else(|| ProviderError::Transport("no scripted reply".to_string())),
            }
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockProvider;
