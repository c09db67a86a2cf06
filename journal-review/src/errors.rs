//! Errors that escape the pipeline's public operations.
//!
//! `review` converts expected external failures into degradation notes, so
//! only pre-flight problems surface here. `semantic_search` and `embed_all`
//! additionally report the embedding backend being down, since without it
//! they have nothing to return.

use thiserror::Error;

/// Result alias for public pipeline operations.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Failure reasons for the exposed operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Invalid input detected before any external call: blank topic,
    /// scope naming an untracked repository, zero-sized limits.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Referenced commit or repository is absent from the journal.
    #[error("not found: {0}")]
    NotFound(String),

    /// The embedding backend cannot be reached at all.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),
}
