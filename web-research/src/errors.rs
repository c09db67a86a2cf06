//! Error taxonomy for search and fetch.
//!
//! Provider-aware mapping: 429 → `RateLimited`, 5xx → `Server`, transport
//! timeout → `Timeout`, everything connection-shaped → `Network`. The
//! pipeline treats all of these as stage-local degradations.

use thiserror::Error;

/// Result alias for web retrieval operations.
pub type WebResult<T> = Result<T, WebError>;

/// Errors produced by search backends and the page fetcher.
#[derive(Debug, Error)]
pub enum WebError {
    /// Upstream asked us to slow down (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other non-success HTTP status.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of a backend response.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Every configured search backend failed for this query.
    #[error("no search backend available")]
    SearchUnavailable,

    /// Backend disabled for the rest of the session after repeated 429s.
    #[error("backend disabled for this session")]
    Disabled,
}

impl From<reqwest::Error> for WebError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return WebError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                429 => WebError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => WebError::Server(code),
                _ => WebError::HttpStatus(code),
            };
        }
        WebError::Network(e.to_string())
    }
}
