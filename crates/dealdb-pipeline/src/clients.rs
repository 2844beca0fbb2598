//! Seams between the stages and their external services.

use async_trait::async_trait;
use dealdb_ai::{AiError, EmbeddingClient, ExtractionClient};
use dealdb_core::SourcePost;
use dealdb_sources::{RedditClient, SourceError};
use serde_json::Value;

/// A named-channel feed of top-ranked posts.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_top(
        &self,
        source: &str,
        limit: u32,
        period: &str,
    ) -> Result<Vec<SourcePost>, SourceError>;
}

/// Turns a post into untyped extraction output, `None` on any failure.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, title: &str, body: &str) -> Option<Value>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
}

#[async_trait]
impl ContentSource for RedditClient {
    async fn fetch_top(
        &self,
        source: &str,
        limit: u32,
        period: &str,
    ) -> Result<Vec<SourcePost>, SourceError> {
        RedditClient::fetch_top(self, source, limit, period).await
    }
}

#[async_trait]
impl Extractor for ExtractionClient {
    async fn extract(&self, title: &str, body: &str) -> Option<Value> {
        ExtractionClient::extract(self, title, body).await
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        EmbeddingClient::embed(self, text).await
    }
}
