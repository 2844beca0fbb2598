//! Production wiring of the stages for the CLI and server dispatchers.

use dealdb_ai::{EmbeddingClient, ExtractionClient};
use dealdb_core::{AiSettings, AppConfig, ConfigError, PipelineConfig};
use dealdb_db::{PgDealStore, PipelineStage, TriggerSource};
use dealdb_sources::RedditClient;
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::ledger::run_recorded;
use crate::{
    run_embedding_backfill, run_extraction, run_ingestion, run_retention, EmbeddingSummary,
    ExtractionSummary, IngestionSummary, RetentionSummary,
};

/// Postgres store, content source and AI clients built once from
/// [`AppConfig`]. Every method records its run in the ledger.
///
/// The AI clients are only built when an API key is configured, so
/// ingestion and retention work without one.
pub struct PipelineRunner {
    store: PgDealStore,
    config: PipelineConfig,
    source: RedditClient,
    extractor: Option<ExtractionClient>,
    embedder: Option<EmbeddingClient>,
}

impl PipelineRunner {
    /// # Errors
    ///
    /// Returns [`PipelineError::Source`] or [`PipelineError::Ai`] if an HTTP
    /// client cannot be built.
    pub fn from_app_config(pool: PgPool, app: &AppConfig) -> Result<Self, PipelineError> {
        let source = RedditClient::with_base_url(
            &app.reddit_user_agent,
            app.source_request_timeout_secs,
            &app.reddit_base_url,
        )?;

        let (extractor, embedder) = match AiSettings::from_app_config(app) {
            Ok(settings) => (
                Some(ExtractionClient::new(&settings)?),
                Some(EmbeddingClient::new(&settings)?),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "AI provider not configured; extract and embed are disabled");
                (None, None)
            }
        };

        Ok(Self {
            store: PgDealStore::new(pool),
            config: PipelineConfig::from_app_config(app),
            source,
            extractor,
            embedder,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    /// # Errors
    ///
    /// See [`run_ingestion`] and [`run_recorded`].
    pub async fn ingest(&self, trigger: TriggerSource) -> Result<IngestionSummary, PipelineError> {
        run_recorded(
            self.pool(),
            PipelineStage::Ingestion,
            trigger,
            run_ingestion(&self.config, &self.source, &self.store),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] without recording a run when no AI
    /// key is configured; otherwise see [`run_extraction`].
    pub async fn extract(
        &self,
        trigger: TriggerSource,
        batch_size: i64,
    ) -> Result<ExtractionSummary, PipelineError> {
        let extractor = self.extractor.as_ref().ok_or_else(missing_ai_key)?;
        run_recorded(
            self.pool(),
            PipelineStage::Extraction,
            trigger,
            run_extraction(batch_size, extractor, &self.store),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] without recording a run when no AI
    /// key is configured; otherwise see [`run_embedding_backfill`].
    pub async fn embed(
        &self,
        trigger: TriggerSource,
        batch_size: i64,
    ) -> Result<EmbeddingSummary, PipelineError> {
        let embedder = self.embedder.as_ref().ok_or_else(missing_ai_key)?;
        run_recorded(
            self.pool(),
            PipelineStage::EmbeddingBackfill,
            trigger,
            run_embedding_backfill(batch_size, embedder, &self.store),
        )
        .await
    }

    /// # Errors
    ///
    /// See [`run_retention`] and [`run_recorded`].
    pub async fn retain(&self, trigger: TriggerSource) -> Result<RetentionSummary, PipelineError> {
        run_recorded(
            self.pool(),
            PipelineStage::Retention,
            trigger,
            run_retention(&self.store),
        )
        .await
    }
}

fn missing_ai_key() -> PipelineError {
    PipelineError::Config(ConfigError::MissingEnvVar("DEALDB_AI_API_KEY".to_string()))
}
