//! Retention sweep over consumed raw deals.

use dealdb_db::DealStore;
use serde::Serialize;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSummary {
    pub message: String,
    pub deleted_count: u64,
    pub remaining_raw_count: i64,
}

/// Deletes every processed raw deal. Unprocessed rows are never touched.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the raw store fails.
pub async fn run_retention(store: &dyn DealStore) -> Result<RetentionSummary, PipelineError> {
    let processed = store.raw_count_processed().await?;
    if processed == 0 {
        let remaining_raw_count = store.raw_count_all().await?;
        tracing::info!(remaining_raw_count, "no processed raw deals to delete");
        return Ok(RetentionSummary {
            message: "No processed raw deals to delete".to_string(),
            deleted_count: 0,
            remaining_raw_count,
        });
    }

    let deleted_count = store.raw_delete_processed().await?;
    let remaining_raw_count = store.raw_count_all().await?;
    tracing::info!(deleted_count, remaining_raw_count, "retention sweep complete");

    Ok(RetentionSummary {
        message: format!("Deleted {deleted_count} processed raw deals"),
        deleted_count,
        remaining_raw_count,
    })
}
