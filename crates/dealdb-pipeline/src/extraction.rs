//! Extraction stage: the `UNPROCESSED -> PROCESSED` state machine over raw
//! deals.
//!
//! Each selected raw deal goes through the extractor and the validation gate
//! exactly once. Whatever the verdict, it is marked processed afterwards and
//! never selected again. Promotion and marking are separate writes; a crash
//! between them means the next run re-extracts the post and the deal insert
//! reports [`InsertOutcome::AlreadyExists`], which counts as promoted.

use dealdb_core::{InsertOutcome, NewDeal};
use dealdb_db::DealStore;
use serde::Serialize;
use serde_json::Value;

use crate::clients::Extractor;
use crate::error::PipelineError;
use crate::validate::{evaluate, SkipReason, Verdict};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCounts {
    pub total_processed: usize,
    pub successfully_saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDeal {
    pub external_id: String,
    pub ai_result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDeal {
    pub external_id: String,
    pub reason: SkipReason,
    /// The raw extractor output, kept for diagnosing schema drift.
    pub ai_result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    pub message: String,
    pub summary: ExtractionCounts,
    pub processed_deals: Vec<ProcessedDeal>,
    pub skipped_deals: Vec<SkippedDeal>,
}

/// Extracts up to `batch_size` unprocessed raw deals, oldest first.
///
/// Returns immediately, without calling the extractor, when nothing is
/// waiting. A `batch_size` below one is treated as one.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if either store fails.
pub async fn run_extraction(
    batch_size: i64,
    extractor: &dyn Extractor,
    store: &dyn DealStore,
) -> Result<ExtractionSummary, PipelineError> {
    let pending = store.raw_count_unprocessed().await?;
    if pending == 0 {
        tracing::info!("no unprocessed raw deals");
        return Ok(ExtractionSummary {
            message: "No unprocessed deals to extract".to_string(),
            summary: ExtractionCounts::default(),
            processed_deals: Vec::new(),
            skipped_deals: Vec::new(),
        });
    }

    let batch = store.raw_select_unprocessed(batch_size.max(1)).await?;
    tracing::info!(pending, batch = batch.len(), "extraction started");

    let mut processed_deals = Vec::new();
    let mut skipped_deals = Vec::new();

    for raw in &batch {
        let result = extractor.extract(&raw.title, &raw.body_text).await;

        match evaluate(result.as_ref()) {
            Verdict::Valid(fields) => {
                let deal = NewDeal::promote(raw, fields);
                match store.deal_create(&deal).await? {
                    InsertOutcome::Inserted => {
                        tracing::debug!(external_id = %raw.external_id, "deal promoted");
                    }
                    InsertOutcome::AlreadyExists => {
                        tracing::warn!(
                            external_id = %raw.external_id,
                            "deal already exists from an earlier run, treating as promoted"
                        );
                    }
                }
                processed_deals.push(ProcessedDeal {
                    external_id: raw.external_id.clone(),
                    ai_result: result.unwrap_or(Value::Null),
                });
            }
            Verdict::Invalid(reason) => {
                tracing::warn!(external_id = %raw.external_id, %reason, "raw deal skipped");
                skipped_deals.push(SkippedDeal {
                    external_id: raw.external_id.clone(),
                    reason,
                    ai_result: result,
                });
            }
        }

        store.raw_mark_processed(&raw.external_id).await?;
    }

    let summary = ExtractionCounts {
        total_processed: batch.len(),
        successfully_saved: processed_deals.len(),
        skipped: skipped_deals.len(),
    };
    tracing::info!(
        total_processed = summary.total_processed,
        successfully_saved = summary.successfully_saved,
        skipped = summary.skipped,
        "extraction complete"
    );

    Ok(ExtractionSummary {
        message: format!(
            "Processed {} raw deals: {} saved, {} skipped",
            summary.total_processed, summary.successfully_saved, summary.skipped
        ),
        summary,
        processed_deals,
        skipped_deals,
    })
}
