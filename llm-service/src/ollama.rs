//! Thin client for the local Ollama API.
//!
//! - `POST {endpoint}/api/generate`   — non-streaming text generation
//! - `POST {endpoint}/api/embeddings` — embedding retrieval
//!
//! One client per profile; the HTTP client is built once with the profile's
//! timeout and reused across calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmModelConfig;
use crate::errors::{LlmError, LlmResult};

/// Reusable Ollama client bound to one model profile.
pub struct OllamaClient {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embeddings: String,
}

impl OllamaClient {
    /// Creates a client from the given profile.
    ///
    /// # Errors
    /// - [`LlmError::InvalidEndpoint`] if the endpoint is malformed
    /// - [`LlmError::Unavailable`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> LlmResult<Self> {
        cfg.validate()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url_generate = format!("{}/api/generate", base);
        let url_embeddings = format!("{}/api/embeddings", base);

        Ok(Self {
            client,
            cfg,
            url_generate,
            url_embeddings,
        })
    }

    /// The model this client is bound to.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Non-streaming generation request.
    ///
    /// # Errors
    /// Transport and status errors per [`LlmError`]; [`LlmError::Decode`]
    /// when the body is not the expected `{ response: string }`.
    pub async fn generate_raw(&self, prompt: &str) -> LlmResult<String> {
        let body = GenerateRequest::from_cfg(&self.cfg, prompt);

        debug!("POST {} model={}", self.url_generate, self.cfg.model);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        let resp = check_status(resp, &self.url_generate).await?;

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            LlmError::Decode(format!("serde error: {e}; ensure `stream=false` is used"))
        })?;

        Ok(out.response)
    }

    /// Embedding request.
    ///
    /// # Errors
    /// Transport and status errors per [`LlmError`]; [`LlmError::Decode`]
    /// when the body is not the expected `{ embedding: number[] }`.
    pub async fn embeddings_raw(&self, input: &str) -> LlmResult<Vec<f32>> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            prompt: input,
        };

        debug!("POST {} model={}", self.url_embeddings, self.cfg.model);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        let resp = check_status(resp, &self.url_embeddings).await?;

        let out: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;

        if out.embedding.is_empty() {
            return Err(LlmError::Decode("empty embedding vector".into()));
        }
        Ok(out.embedding)
    }
}

/// Maps a non-success response into the error taxonomy, consuming the body
/// for a short diagnostic snippet.
async fn check_status(resp: reqwest::Response, url: &str) -> LlmResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    if code == 429 {
        return Err(LlmError::RateLimited);
    }
    if (500..=599).contains(&code) {
        return Err(LlmError::Server(code));
    }
    let text = resp.text().await.unwrap_or_default();
    let snippet = text.chars().take(240).collect::<String>();
    Err(LlmError::HttpStatus {
        status: code,
        url: url.to_string(),
        snippet,
    })
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        let options = GenerateOptions {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            num_predict: cfg.max_tokens,
        };
        Self {
            model: &cfg.model,
            prompt,
            stream: false,
            options: Some(options),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            model: "test".into(),
            endpoint: endpoint.into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[test]
    fn rejects_empty_endpoint() {
        assert!(matches!(
            OllamaClient::new(cfg("")),
            Err(LlmError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn rejects_schemeless_endpoint() {
        assert!(matches!(
            OllamaClient::new(cfg("localhost:11434")),
            Err(LlmError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn builds_api_urls_from_trailing_slash_endpoint() {
        let c = OllamaClient::new(cfg("http://localhost:11434/")).unwrap();
        assert_eq!(c.url_generate, "http://localhost:11434/api/generate");
        assert_eq!(c.url_embeddings, "http://localhost:11434/api/embeddings");
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_unavailable() {
        // Port 9 (discard) is never an Ollama daemon.
        let c = OllamaClient::new(cfg("http://127.0.0.1:9")).unwrap();
        let err = c.generate_raw("ping").await.unwrap_err();
        assert!(err.is_unavailable(), "got {err:?}");
    }
}
