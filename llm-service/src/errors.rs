//! Unified error type for LLM calls.
//!
//! Transport failures are folded into a small taxonomy so the pipeline can
//! decide "backend down" vs "slow down" without inspecting reqwest internals.

use thiserror::Error;

/// Result alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors produced by the LLM layer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Invalid endpoint (empty or missing http/https scheme).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Backend unreachable: DNS, connect, reset.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Request exceeded the configured timeout.
    #[error("timeout")]
    Timeout,

    /// Upstream asked us to slow down (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Upstream server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other non-success HTTP status.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// Response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl LlmError {
    /// True when the failure means the backend cannot serve us at all
    /// (as opposed to a malformed but reachable response).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LlmError::Unavailable(_) | LlmError::Timeout | LlmError::Server(_)
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return LlmError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                429 => LlmError::RateLimited,
                500..=599 => LlmError::Server(code),
                _ => LlmError::HttpStatus {
                    status: code,
                    url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                    snippet: String::new(),
                },
            };
        }
        LlmError::Unavailable(e.to_string())
    }
}
