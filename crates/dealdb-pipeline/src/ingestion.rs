//! Ingestion stage: pull top posts from every configured source into the
//! raw store.

use dealdb_core::{InsertOutcome, NewRawDeal, PipelineConfig};
use dealdb_db::DealStore;
use serde::Serialize;

use crate::clients::ContentSource;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub message: String,
    pub new_post_ids: Vec<String>,
    /// Sources whose fetch failed this run; retried on the next run.
    pub failed_sources: Vec<String>,
}

/// Runs ingestion once across all sources in `config`.
///
/// Posts with a blank body, and posts whose external id is already in the
/// raw store, are skipped. A failing source is logged and skipped; the
/// remaining sources still run.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the raw store cannot be read or written.
pub async fn run_ingestion(
    config: &PipelineConfig,
    source: &dyn ContentSource,
    store: &dyn DealStore,
) -> Result<IngestionSummary, PipelineError> {
    let mut new_post_ids = Vec::new();
    let mut failed_sources = Vec::new();

    for name in &config.sources {
        let posts = match source.fetch_top(name, config.page_size, &config.period).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "source fetch failed, skipping");
                failed_sources.push(name.clone());
                continue;
            }
        };

        let fetched = posts.len();
        let mut inserted = 0usize;
        for post in posts {
            if !post.has_body() {
                tracing::debug!(source = %name, external_id = %post.external_id, "empty body, skipping");
                continue;
            }
            if store.raw_exists(&post.external_id).await? {
                tracing::debug!(source = %name, external_id = %post.external_id, "already ingested");
                continue;
            }

            let external_id = post.external_id.clone();
            match store.raw_insert(&NewRawDeal::from_post(name, post)).await? {
                InsertOutcome::Inserted => {
                    inserted += 1;
                    new_post_ids.push(external_id);
                }
                InsertOutcome::AlreadyExists => {
                    tracing::debug!(source = %name, %external_id, "inserted concurrently, skipping");
                }
            }
        }

        tracing::info!(source = %name, fetched, inserted, "source ingested");
    }

    let message = format!(
        "Ingested {} new posts from {} of {} sources",
        new_post_ids.len(),
        config.sources.len() - failed_sources.len(),
        config.sources.len()
    );
    tracing::info!(
        new_posts = new_post_ids.len(),
        failed_sources = failed_sources.len(),
        "ingestion complete"
    );

    Ok(IngestionSummary {
        message,
        new_post_ids,
        failed_sources,
    })
}
