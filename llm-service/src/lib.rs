//! Local LLM access for the developer journal.
//!
//! Two concerns, one crate:
//! - text generation via Ollama `POST {endpoint}/api/generate` (`stream=false`);
//! - embeddings via Ollama `POST {endpoint}/api/embeddings`.
//!
//! The rest of the workspace consumes these through the [`TextGenerator`] and
//! [`TextEmbedder`] seams so the pipeline can be exercised with canned
//! backends in tests. Errors are unified in [`LlmError`] with a transport
//! mapping (timeout, rate limit, server status) so callers can treat a dead
//! daemon and a network outage uniformly.

pub mod config;
pub mod errors;
pub mod ollama;

pub use config::{LlmModelConfig, LlmProfiles};
pub use errors::{LlmError, LlmResult};
pub use ollama::OllamaClient;

use async_trait::async_trait;

/// Text generation seam: one prompt in, plain text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// # Errors
    /// [`LlmError::Unavailable`]-class variants when the backend cannot be
    /// reached; [`LlmError::Decode`] when the response body is not the
    /// expected shape.
    async fn generate(&self, prompt: &str) -> LlmResult<String>;
}

/// Embedding seam: one text in, one fixed-length vector out.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Produces an embedding vector for `text`.
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        self.generate_raw(prompt).await
    }
}

#[async_trait]
impl TextEmbedder for OllamaClient {
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        self.embeddings_raw(text).await
    }
}
