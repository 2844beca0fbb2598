//! Background job scheduler.
//!
//! Registers one recurring job per pipeline stage. Every job goes through the
//! shared [`Dispatcher`], so a scheduled tick that lands while the same stage
//! is running (from a previous tick or an API trigger) is skipped.

use std::sync::Arc;

use dealdb_core::CronSchedule;
use dealdb_db::{PipelineStage, TriggerSource};
use dealdb_pipeline::StageSummary;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::dispatch::{DispatchError, Dispatcher};

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// cron expression does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    dispatcher: Arc<Dispatcher>,
    cron: &CronSchedule,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let jobs = [
        (PipelineStage::Ingestion, &cron.ingest),
        (PipelineStage::Extraction, &cron.extract),
        (PipelineStage::EmbeddingBackfill, &cron.embed),
        (PipelineStage::Retention, &cron.retention),
    ];
    for (stage, schedule) in jobs {
        register_stage_job(&scheduler, stage, schedule, Arc::clone(&dispatcher)).await?;
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_stage_job(
    scheduler: &JobScheduler,
    stage: PipelineStage,
    schedule: &str,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let dispatcher = Arc::clone(&dispatcher);

        Box::pin(async move {
            tracing::info!(%stage, "scheduler: starting run");
            match run_stage(&dispatcher, stage).await {
                Ok(records) => {
                    tracing::info!(%stage, records, "scheduler: run complete");
                }
                Err(DispatchError::Busy(_)) => {
                    tracing::info!(%stage, "scheduler: stage already running, skipping tick");
                }
                Err(e) => {
                    tracing::error!(%stage, error = %e, "scheduler: run failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::debug!(%stage, schedule, "scheduler: job registered");
    Ok(())
}

async fn run_stage(dispatcher: &Dispatcher, stage: PipelineStage) -> Result<usize, DispatchError> {
    let trigger = TriggerSource::Scheduler;
    let records = match stage {
        PipelineStage::Ingestion => dispatcher.ingest(trigger).await?.records_processed(),
        PipelineStage::Extraction => dispatcher
            .extract(trigger, dispatcher.extract_batch_scheduled())
            .await?
            .records_processed(),
        PipelineStage::EmbeddingBackfill => dispatcher
            .embed(trigger, dispatcher.embed_batch())
            .await?
            .records_processed(),
        PipelineStage::Retention => dispatcher.retain(trigger).await?.records_processed(),
    };
    Ok(records)
}
