//! Unified error types for the crate.

use thiserror::Error;

/// Result alias for store and index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Top-level error for commit-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O or filesystem errors while reading the journal.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSONL parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(String),

    /// Embedding backend cannot be reached; the record stays unindexed.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(#[from] llm_service::LlmError),

    /// The embedded text produced a zero vector; cosine is undefined.
    #[error("zero-magnitude embedding for record {0}")]
    ZeroVector(String),

    /// Referenced commit is absent from the store.
    #[error("commit not found: {0}")]
    NotFound(String),
}
