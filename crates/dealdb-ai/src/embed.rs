//! Text embeddings for semantic search over deals.

use std::time::Duration;

use dealdb_core::AiSettings;
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::http::{build_client, endpoint, post_json};
use crate::retry::RetryPolicy;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embeddings endpoint client producing vectors of a fixed length.
pub struct EmbeddingClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: &AiSettings) -> Result<Self, AiError> {
        Ok(Self {
            client: build_client(settings.request_timeout_secs)?,
            url: endpoint(&settings.base_url, "embeddings"),
            api_key: settings.api_key.clone(),
            model: settings.embedding_model.clone(),
            dimensions: settings.embedding_dimensions,
            retry: RetryPolicy::linear(
                settings.max_attempts,
                Duration::from_millis(settings.backoff_ms),
            ),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// - [`AiError::RateLimited`], [`AiError::Http`] or [`AiError::Status`]
    ///   from the provider.
    /// - [`AiError::Deserialize`] on a malformed body.
    /// - [`AiError::Embedding`] if the response holds no vector.
    /// - [`AiError::DimensionMismatch`] if the vector has the wrong length.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let raw = self
            .retry
            .run(|_| post_json(&self.client, &self.url, &self.api_key, &request))
            .await?;

        let response: EmbeddingResponse =
            serde_json::from_str(&raw).map_err(|e| AiError::Deserialize {
                context: "embedding response".to_string(),
                source: e,
            })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AiError::Embedding("response contained no embedding".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(AiError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }
}
