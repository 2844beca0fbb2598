//! Records dispatcher-initiated stage runs in the `pipeline_runs` ledger.

use std::future::Future;

use dealdb_db::{
    complete_pipeline_run, create_pipeline_run, fail_pipeline_run, start_pipeline_run,
    PipelineStage, TriggerSource,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::{EmbeddingSummary, ExtractionSummary, IngestionSummary, RetentionSummary};

/// A stage summary that can be stored on its run.
pub trait StageSummary: Serialize {
    /// Count stored in `pipeline_runs.records_processed`.
    fn records_processed(&self) -> usize;
}

impl StageSummary for IngestionSummary {
    fn records_processed(&self) -> usize {
        self.new_post_ids.len()
    }
}

impl StageSummary for ExtractionSummary {
    fn records_processed(&self) -> usize {
        self.summary.total_processed
    }
}

impl StageSummary for EmbeddingSummary {
    fn records_processed(&self) -> usize {
        self.processed
    }
}

impl StageSummary for RetentionSummary {
    fn records_processed(&self) -> usize {
        usize::try_from(self.deleted_count).unwrap_or(usize::MAX)
    }
}

/// Runs `work` inside a `queued → running → succeeded | failed` run.
///
/// A failure to mark the run complete is logged and does not replace the
/// stage's own result.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the run cannot be created or started,
/// otherwise whatever `work` returns.
pub async fn run_recorded<S, Fut>(
    pool: &PgPool,
    stage: PipelineStage,
    trigger: TriggerSource,
    work: Fut,
) -> Result<S, PipelineError>
where
    S: StageSummary,
    Fut: Future<Output = Result<S, PipelineError>>,
{
    let run = create_pipeline_run(pool, stage, trigger).await?;
    if let Err(e) = start_pipeline_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, stage, &e.to_string()).await;
        return Err(e.into());
    }

    match work.await {
        Ok(summary) => {
            let records = i32::try_from(summary.records_processed()).unwrap_or(i32::MAX);
            let payload = serde_json::to_value(&summary).unwrap_or_default();
            if let Err(e) = complete_pipeline_run(pool, run.id, records, payload).await {
                tracing::error!(run_id = run.id, %stage, error = %e, "failed to mark run as succeeded");
            }
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(run_id = run.id, %stage, trigger = trigger.as_str(), error = %e, "stage failed");
            fail_run_best_effort(pool, run.id, stage, &e.to_string()).await;
            Err(e)
        }
    }
}

/// Attempt to mark a run as failed, logging any secondary error.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, stage: PipelineStage, message: &str) {
    if let Err(mark_err) = fail_pipeline_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {stage} run as failed"
        );
    }
}
