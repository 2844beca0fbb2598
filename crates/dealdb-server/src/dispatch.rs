//! Single-flight stage dispatch shared by the scheduler and the API.
//!
//! Each stage owns one lock. A trigger that finds its stage's lock held is
//! rejected with [`DispatchError::Busy`] instead of queueing, so two runs of
//! the same stage never select overlapping batches within this process.

use dealdb_core::AppConfig;
use dealdb_db::{PipelineStage, TriggerSource};
use dealdb_pipeline::{
    EmbeddingSummary, ExtractionSummary, IngestionSummary, PipelineError, PipelineRunner,
    RetentionSummary,
};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} stage is already running")]
    Busy(PipelineStage),

    #[error(transparent)]
    Stage(#[from] PipelineError),
}

#[derive(Debug, Default)]
pub struct StageGuards {
    ingestion: Mutex<()>,
    extraction: Mutex<()>,
    embedding: Mutex<()>,
    retention: Mutex<()>,
}

impl StageGuards {
    fn lock_for(&self, stage: PipelineStage) -> &Mutex<()> {
        match stage {
            PipelineStage::Ingestion => &self.ingestion,
            PipelineStage::Extraction => &self.extraction,
            PipelineStage::EmbeddingBackfill => &self.embedding,
            PipelineStage::Retention => &self.retention,
        }
    }

    /// Claims `stage` if no other run of it is in flight.
    pub fn try_acquire(&self, stage: PipelineStage) -> Result<MutexGuard<'_, ()>, DispatchError> {
        self.lock_for(stage)
            .try_lock()
            .map_err(|_| DispatchError::Busy(stage))
    }
}

pub struct Dispatcher {
    runner: PipelineRunner,
    guards: StageGuards,
    extract_batch_scheduled: i64,
    extract_batch_on_demand: i64,
    embed_batch: i64,
}

impl Dispatcher {
    pub fn new(runner: PipelineRunner, config: &AppConfig) -> Self {
        Self {
            runner,
            guards: StageGuards::default(),
            extract_batch_scheduled: config.extract_batch_scheduled,
            extract_batch_on_demand: config.extract_batch_on_demand,
            embed_batch: config.embed_batch,
        }
    }

    pub fn guards(&self) -> &StageGuards {
        &self.guards
    }

    pub fn extract_batch_scheduled(&self) -> i64 {
        self.extract_batch_scheduled
    }

    pub fn extract_batch_on_demand(&self) -> i64 {
        self.extract_batch_on_demand
    }

    pub fn embed_batch(&self) -> i64 {
        self.embed_batch
    }

    pub async fn ingest(&self, trigger: TriggerSource) -> Result<IngestionSummary, DispatchError> {
        let _guard = self.guards.try_acquire(PipelineStage::Ingestion)?;
        Ok(self.runner.ingest(trigger).await?)
    }

    pub async fn extract(
        &self,
        trigger: TriggerSource,
        batch_size: i64,
    ) -> Result<ExtractionSummary, DispatchError> {
        let _guard = self.guards.try_acquire(PipelineStage::Extraction)?;
        Ok(self.runner.extract(trigger, batch_size).await?)
    }

    pub async fn embed(
        &self,
        trigger: TriggerSource,
        batch_size: i64,
    ) -> Result<EmbeddingSummary, DispatchError> {
        let _guard = self.guards.try_acquire(PipelineStage::EmbeddingBackfill)?;
        Ok(self.runner.embed(trigger, batch_size).await?)
    }

    pub async fn retain(&self, trigger: TriggerSource) -> Result<RetentionSummary, DispatchError> {
        let _guard = self.guards.try_acquire(PipelineStage::Retention)?;
        Ok(self.runner.retain(trigger).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{lazy_dispatcher, test_config};
    use super::*;

    #[test]
    fn second_claim_on_same_stage_is_busy() {
        let guards = StageGuards::default();
        let held = guards.try_acquire(PipelineStage::Extraction).unwrap();

        let err = guards.try_acquire(PipelineStage::Extraction).unwrap_err();
        assert!(matches!(err, DispatchError::Busy(PipelineStage::Extraction)));
        assert_eq!(err.to_string(), "extraction stage is already running");

        drop(held);
        assert!(guards.try_acquire(PipelineStage::Extraction).is_ok());
    }

    #[test]
    fn stages_are_guarded_independently() {
        let guards = StageGuards::default();
        let _extract = guards.try_acquire(PipelineStage::Extraction).unwrap();
        assert!(guards.try_acquire(PipelineStage::Ingestion).is_ok());
        assert!(guards.try_acquire(PipelineStage::EmbeddingBackfill).is_ok());
        assert!(guards.try_acquire(PipelineStage::Retention).is_ok());
    }

    #[tokio::test]
    async fn busy_stage_is_rejected_without_running() {
        let config = test_config(&[]);
        let dispatcher = lazy_dispatcher(&config);
        let _held = dispatcher
            .guards()
            .try_acquire(PipelineStage::Retention)
            .unwrap();

        let err = dispatcher.retain(TriggerSource::Api).await.unwrap_err();
        assert!(matches!(err, DispatchError::Busy(PipelineStage::Retention)));
    }

    #[tokio::test]
    async fn batch_sizes_come_from_config() {
        let config = test_config(&[
            ("DEALDB_EXTRACT_BATCH_SCHEDULED", "4"),
            ("DEALDB_EMBED_BATCH", "6"),
        ]);
        let dispatcher = lazy_dispatcher(&config);
        assert_eq!(dispatcher.extract_batch_scheduled(), 4);
        assert_eq!(dispatcher.extract_batch_on_demand(), 3);
        assert_eq!(dispatcher.embed_batch(), 6);
    }
}
