//! Embedding backfill: give every promoted deal a vector exactly once.

use dealdb_core::EmbeddingCandidate;
use dealdb_db::DealStore;
use serde::Serialize;

use crate::clients::Embedder;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSummary {
    pub message: String,
    pub processed: usize,
    pub failed: usize,
    pub total_deals: usize,
}

/// Builds the text that represents a deal in vector space.
///
/// Title, summary and other details, one per line, followed by labelled
/// figures only for those that are present.
#[must_use]
pub fn compose_text(deal: &EmbeddingCandidate) -> String {
    let mut lines = vec![
        deal.original_title.clone(),
        deal.professional_summary.clone(),
        deal.other_important_stuff.clone(),
    ];

    let figures = [
        ("Monthly Revenue", &deal.monthly_revenue),
        ("Asking Price", &deal.asking_price),
        ("User Count", &deal.user_count),
    ];
    for (label, value) in figures {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            lines.push(format!("{label}: {value}"));
        }
    }

    lines.join("\n")
}

/// Embeds up to `batch_size` deals that have no vector yet.
///
/// A deal that fails to embed or store is counted in `failed`, recorded as
/// attempted so later runs reach the deals behind it first, and left for a
/// later run; it never aborts the batch.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the candidate selection fails.
pub async fn run_embedding_backfill(
    batch_size: i64,
    embedder: &dyn Embedder,
    store: &dyn DealStore,
) -> Result<EmbeddingSummary, PipelineError> {
    let candidates = store.deal_select_missing_embedding(batch_size.max(1)).await?;
    if candidates.is_empty() {
        tracing::info!("no deals missing embeddings");
        return Ok(EmbeddingSummary {
            message: "No deals need embeddings".to_string(),
            processed: 0,
            failed: 0,
            total_deals: 0,
        });
    }

    let mut processed = 0usize;
    let mut failed = 0usize;

    for deal in &candidates {
        let text = compose_text(deal);
        let embedding = match embedder.embed(&text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(deal_id = deal.id, external_id = %deal.external_id, error = %e, "embedding failed");
                failed += 1;
                record_failure(store, deal.id).await;
                continue;
            }
        };

        match store.deal_set_embedding(deal.id, &embedding).await {
            Ok(true) => processed += 1,
            Ok(false) => {
                tracing::debug!(deal_id = deal.id, "embedding already set, left unchanged");
                processed += 1;
            }
            Err(e) => {
                tracing::warn!(deal_id = deal.id, error = %e, "storing embedding failed");
                failed += 1;
                record_failure(store, deal.id).await;
            }
        }
    }

    tracing::info!(
        processed,
        failed,
        total = candidates.len(),
        "embedding backfill complete"
    );

    Ok(EmbeddingSummary {
        message: format!(
            "Embedded {processed} of {} deals ({failed} failed)",
            candidates.len()
        ),
        processed,
        failed,
        total_deals: candidates.len(),
    })
}

async fn record_failure(store: &dyn DealStore, deal_id: i64) {
    if let Err(e) = store.deal_record_embedding_failure(deal_id).await {
        tracing::warn!(deal_id, error = %e, "could not record failed embedding attempt");
    }
}
