//! Explicit per-invocation configuration handed to pipeline stages.

use crate::{AppConfig, ConfigError};

/// Settings consumed by the ingestion stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Named channels (subreddits) pulled on every ingestion run.
    pub sources: Vec<String>,
    /// Posts requested per source per run.
    pub page_size: u32,
    /// Ranking window passed to the source, e.g. `day`.
    pub period: String,
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            sources: config.sources.clone(),
            page_size: config.source_page_size,
            period: config.source_period.clone(),
        }
    }
}

/// Connection and retry settings for the AI provider.
#[derive(Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub base_url: String,
    pub extraction_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("extraction_model", &self.extraction_model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AiSettings {
    /// Derive AI settings from the app config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DEALDB_AI_API_KEY` was not
    /// provided. The key is optional at load time so that stages that never
    /// call the AI provider (retention, migrations) can run without it.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .ai_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("DEALDB_AI_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            base_url: config.ai_base_url.clone(),
            extraction_model: config.extraction_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimensions: config.embedding_dimensions,
            max_attempts: config.ai_max_attempts,
            backoff_ms: config.ai_backoff_ms,
            request_timeout_secs: config.ai_request_timeout_secs,
        })
    }
}

/// Cron expressions (six fields, seconds first) mapping triggers to stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    pub ingest: String,
    pub extract: String,
    pub embed: String,
    pub retention: String,
}

impl CronSchedule {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            ingest: config.cron_ingest.clone(),
            extract: config.cron_extract.clone(),
            embed: config.cron_embed.clone(),
            retention: config.cron_retention.clone(),
        }
    }
}
