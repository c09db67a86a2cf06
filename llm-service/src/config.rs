//! Model configuration and env loading.

use crate::errors::LlmError;

/// Configuration for one model invocation profile.
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    /// Model identifier string (e.g. `"qwen3:14b"`, `"nomic-embed-text"`).
    pub model: String,

    /// Inference endpoint, e.g. `http://localhost:11434`.
    pub endpoint: String,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Validates the endpoint shape.
    ///
    /// # Errors
    /// [`LlmError::InvalidEndpoint`] when the endpoint is empty or lacks a
    /// http/https scheme.
    pub fn validate(&self) -> Result<(), LlmError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(self.endpoint.clone()));
        }
        Ok(())
    }
}

/// The two profiles the journal uses: report generation and embeddings.
///
/// Both default to the same local Ollama endpoint; the embedding profile
/// typically names a dedicated embedding model.
#[derive(Debug, Clone)]
pub struct LlmProfiles {
    pub generation: LlmModelConfig,
    pub embedding: LlmModelConfig,
}

impl LlmProfiles {
    /// Builds profiles from environment variables with local defaults.
    ///
    /// - `OLLAMA_URL` (default `http://127.0.0.1:11434`)
    /// - `OLLAMA_MODEL` (default `qwen3:14b`)
    /// - `OLLAMA_EMBED_MODEL` (default `nomic-embed-text`)
    /// - `LLM_GENERATE_TIMEOUT_SECS` (default 90)
    /// - `LLM_EMBED_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen3:14b".to_string());
        let embed_model =
            std::env::var("OLLAMA_EMBED_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string());
        let gen_timeout = std::env::var("LLM_GENERATE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(90);
        let embed_timeout = std::env::var("LLM_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        LlmProfiles {
            generation: LlmModelConfig {
                model,
                endpoint: endpoint.clone(),
                max_tokens: None,
                temperature: Some(0.4),
                top_p: None,
                timeout_secs: Some(gen_timeout),
            },
            embedding: LlmModelConfig {
                model: embed_model,
                endpoint,
                max_tokens: None,
                temperature: None,
                top_p: None,
                timeout_secs: Some(embed_timeout),
            },
        }
    }
}
