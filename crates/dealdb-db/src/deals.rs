//! Database operations for the `deals` table.

use chrono::{DateTime, Utc};
use dealdb_core::{EmbeddingCandidate, InsertOutcome, NewDeal};
use pgvector::Vector;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `deals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DealRow {
    pub id: i64,
    pub external_id: String,
    pub original_title: String,
    pub url: String,
    pub score: i64,
    pub source: String,
    pub images: Vec<String>,
    pub is_sale: bool,
    pub low_quality: bool,
    pub professional_summary: Option<String>,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
    pub link: Vec<String>,
    pub other_important_stuff: Option<String>,
    pub embedding: Option<Vector>,
    pub embedding_attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// The columns needed to compose embedding text for one deal.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmbeddingCandidateRow {
    pub id: i64,
    pub external_id: String,
    pub original_title: String,
    pub professional_summary: String,
    pub other_important_stuff: String,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
}

impl From<EmbeddingCandidateRow> for EmbeddingCandidate {
    fn from(row: EmbeddingCandidateRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            original_title: row.original_title,
            professional_summary: row.professional_summary,
            other_important_stuff: row.other_important_stuff,
            monthly_revenue: row.monthly_revenue,
            asking_price: row.asking_price,
            user_count: row.user_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Create a deal. At most one deal exists per `external_id`.
///
/// A conflicting `external_id` returns [`InsertOutcome::AlreadyExists`]
/// and leaves the stored deal unchanged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_deal(pool: &PgPool, deal: &NewDeal) -> Result<InsertOutcome, DbError> {
    let result = sqlx::query(
        "INSERT INTO deals \
             (external_id, original_title, url, score, source, images, is_sale, low_quality, \
              professional_summary, monthly_revenue, asking_price, user_count, link, \
              other_important_stuff) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (external_id) DO NOTHING",
    )
    .bind(&deal.external_id)
    .bind(&deal.original_title)
    .bind(&deal.url)
    .bind(deal.score)
    .bind(&deal.source)
    .bind(&deal.images)
    .bind(deal.is_sale)
    .bind(deal.low_quality)
    .bind(&deal.professional_summary)
    .bind(&deal.monthly_revenue)
    .bind(&deal.asking_price)
    .bind(&deal.user_count)
    .bind(&deal.link)
    .bind(&deal.other_important_stuff)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() == 0 {
        InsertOutcome::AlreadyExists
    } else {
        InsertOutcome::Inserted
    })
}

/// Select up to `limit` deals that have no embedding yet and carry both
/// text fields the embedding is composed from.
///
/// Never-attempted deals come first, oldest first; deals whose last attempt
/// failed follow in order of that attempt, so repeat failures rotate to the
/// back instead of filling every batch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_deals_missing_embedding(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<EmbeddingCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, EmbeddingCandidateRow>(
        "SELECT id, external_id, original_title, professional_summary, other_important_stuff, \
                monthly_revenue, asking_price, user_count \
         FROM deals \
         WHERE embedding IS NULL \
           AND professional_summary IS NOT NULL \
           AND other_important_stuff IS NOT NULL \
         ORDER BY embedding_attempted_at ASC NULLS FIRST, created_at ASC, id ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Store an embedding for a deal that does not have one yet.
///
/// Returns `false` when the deal already had an embedding (or does not
/// exist); an existing embedding is never overwritten.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails, including a dimension
/// mismatch against the `vector` column.
pub async fn set_deal_embedding(pool: &PgPool, id: i64, embedding: &[f32]) -> Result<bool, DbError> {
    let vector = Vector::from(embedding.to_vec());
    let result = sqlx::query("UPDATE deals SET embedding = $2 WHERE id = $1 AND embedding IS NULL")
        .bind(id)
        .bind(vector)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Record a failed embedding attempt for a deal that still has no vector.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_embedding_failure(pool: &PgPool, id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE deals \
         SET embedding_attempts = embedding_attempts + 1, embedding_attempted_at = NOW() \
         WHERE id = $1 AND embedding IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Count all structured deals.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_deals(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deals")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Fetch a deal by `external_id`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_deal_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<DealRow>, DbError> {
    let row = sqlx::query_as::<_, DealRow>(
        "SELECT id, external_id, original_title, url, score, source, images, is_sale, \
                low_quality, professional_summary, monthly_revenue, asking_price, user_count, \
                link, other_important_stuff, embedding, embedding_attempts, created_at \
         FROM deals WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
