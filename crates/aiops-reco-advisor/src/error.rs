//! Model provider error types.

use thiserror::Error;

/// A result type using `ProviderError`.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while calling the language-model provider.
///
/// The engine never surfaces these to callers; they decide whether to retry
/// and are then folded into a degraded recommendation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The call did not complete within the model timeout.
    #[error("model call timed out")]
    Timeout,

    /// The request never got a response (connection, DNS, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider asked us to slow down.
    #[error("rate limited")]
    RateLimited,

    /// The provider failed on its side.
    #[error("provider error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The provider refused the request (bad key, unknown model, bad input).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The response was well formed but carried no text.
    #[error("empty response")]
    Empty,

    /// No API key is configured.
    #[error("no API key configured")]
    MissingApiKey,
}

impl ProviderError {
    /// Returns `true` for transient failures worth another attempt.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Transport(_) | Self::RateLimited | Self::Server { .. }
        )
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::RateLimited => "rate_limited",
            Self::Server { .. } => "server",
            Self::Rejected { .. } => "rejected",
            Self::Malformed(_) => "malformed",
            Self::Empty => "empty",
            Self::MissingApiKey => "missing_api_key",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
