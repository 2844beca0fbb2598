//! Database operations for the `raw_deals` table.

use chrono::{DateTime, Utc};
use dealdb_core::{InsertOutcome, NewRawDeal, RawDeal};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `raw_deals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawDealRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub body_text: String,
    pub url: String,
    pub score: i64,
    pub source: String,
    pub images: Vec<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<RawDealRow> for RawDeal {
    fn from(row: RawDealRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            body_text: row.body_text,
            url: row.url,
            score: row.score,
            source: row.source,
            images: row.images,
            processed: row.processed,
            created_at: row.created_at,
        }
    }
}

const RAW_COLUMNS: &str =
    "id, external_id, title, body_text, url, score, source, images, processed, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns `true` if a raw deal with this `external_id` is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn raw_deal_exists(pool: &PgPool, external_id: &str) -> Result<bool, DbError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM raw_deals WHERE external_id = $1)")
            .bind(external_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a raw deal with `processed = false`.
///
/// A conflicting `external_id` is not an error: the existing row is left
/// untouched and [`InsertOutcome::AlreadyExists`] is returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_raw_deal(pool: &PgPool, deal: &NewRawDeal) -> Result<InsertOutcome, DbError> {
    let result = sqlx::query(
        "INSERT INTO raw_deals \
             (external_id, title, body_text, url, score, source, images, processed) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE) \
         ON CONFLICT (external_id) DO NOTHING",
    )
    .bind(&deal.external_id)
    .bind(&deal.title)
    .bind(&deal.body_text)
    .bind(&deal.url)
    .bind(deal.score)
    .bind(&deal.source)
    .bind(&deal.images)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() == 0 {
        InsertOutcome::AlreadyExists
    } else {
        InsertOutcome::Inserted
    })
}

/// Count raw deals not yet consumed by extraction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_unprocessed_raw(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_deals WHERE processed = FALSE")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Select up to `limit` unprocessed raw deals, oldest first.
///
/// Ordered by `created_at, id` so that rows inserted in the same
/// transaction timestamp still come back in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_unprocessed_raw(pool: &PgPool, limit: i64) -> Result<Vec<RawDealRow>, DbError> {
    let rows = sqlx::query_as::<_, RawDealRow>(&format!(
        "SELECT {RAW_COLUMNS} FROM raw_deals \
         WHERE processed = FALSE \
         ORDER BY created_at ASC, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Mark a raw deal consumed.
///
/// Only flips `false → true`; marking an already-processed row is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_raw_processed(pool: &PgPool, external_id: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE raw_deals SET processed = TRUE \
         WHERE external_id = $1 AND processed = FALSE",
    )
    .bind(external_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count raw deals already consumed by extraction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_processed_raw(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_deals WHERE processed = TRUE")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete every consumed raw deal and return how many rows were removed.
///
/// Rows with `processed = false` are never touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_processed_raw(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM raw_deals WHERE processed = TRUE")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Count all raw deals regardless of state.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_all_raw(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_deals")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Fetch a single raw deal by its `external_id`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_raw_deal_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<RawDealRow>, DbError> {
    let row = sqlx::query_as::<_, RawDealRow>(&format!(
        "SELECT {RAW_COLUMNS} FROM raw_deals WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
