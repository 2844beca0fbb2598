//! Typed persistence gateway consumed by the pipeline stages.
//!
//! The trait carries no business logic; [`PgDealStore`] forwards each call to
//! the query functions in this crate.

use async_trait::async_trait;
use dealdb_core::{EmbeddingCandidate, InsertOutcome, NewDeal, NewRawDeal, RawDeal};
use sqlx::PgPool;

use crate::{deals, raw_deals, DbError};

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn raw_exists(&self, external_id: &str) -> Result<bool, DbError>;

    async fn raw_insert(&self, deal: &NewRawDeal) -> Result<InsertOutcome, DbError>;

    async fn raw_count_unprocessed(&self) -> Result<i64, DbError>;

    /// Unprocessed raw deals, oldest first, at most `limit`.
    async fn raw_select_unprocessed(&self, limit: i64) -> Result<Vec<RawDeal>, DbError>;

    async fn raw_mark_processed(&self, external_id: &str) -> Result<(), DbError>;

    async fn raw_count_processed(&self) -> Result<i64, DbError>;

    async fn raw_delete_processed(&self) -> Result<u64, DbError>;

    async fn raw_count_all(&self) -> Result<i64, DbError>;

    async fn deal_create(&self, deal: &NewDeal) -> Result<InsertOutcome, DbError>;

    async fn deal_select_missing_embedding(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingCandidate>, DbError>;

    /// Returns `false` if the deal already had an embedding.
    async fn deal_set_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, DbError>;

    /// Moves a deal behind the other candidates after a failed attempt.
    async fn deal_record_embedding_failure(&self, id: i64) -> Result<(), DbError>;
}

/// Postgres-backed [`DealStore`].
#[derive(Debug, Clone)]
pub struct PgDealStore {
    pool: PgPool,
}

impl PgDealStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DealStore for PgDealStore {
    async fn raw_exists(&self, external_id: &str) -> Result<bool, DbError> {
        raw_deals::raw_deal_exists(&self.pool, external_id).await
    }

    async fn raw_insert(&self, deal: &NewRawDeal) -> Result<InsertOutcome, DbError> {
        raw_deals::insert_raw_deal(&self.pool, deal).await
    }

    async fn raw_count_unprocessed(&self) -> Result<i64, DbError> {
        raw_deals::count_unprocessed_raw(&self.pool).await
    }

    async fn raw_select_unprocessed(&self, limit: i64) -> Result<Vec<RawDeal>, DbError> {
        let rows = raw_deals::select_unprocessed_raw(&self.pool, limit).await?;
        Ok(rows.into_iter().map(RawDeal::from).collect())
    }

    async fn raw_mark_processed(&self, external_id: &str) -> Result<(), DbError> {
        raw_deals::mark_raw_processed(&self.pool, external_id).await
    }

    async fn raw_count_processed(&self) -> Result<i64, DbError> {
        raw_deals::count_processed_raw(&self.pool).await
    }

    async fn raw_delete_processed(&self) -> Result<u64, DbError> {
        raw_deals::delete_processed_raw(&self.pool).await
    }

    async fn raw_count_all(&self) -> Result<i64, DbError> {
        raw_deals::count_all_raw(&self.pool).await
    }

    async fn deal_create(&self, deal: &NewDeal) -> Result<InsertOutcome, DbError> {
        deals::create_deal(&self.pool, deal).await
    }

    async fn deal_select_missing_embedding(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingCandidate>, DbError> {
        let rows = deals::select_deals_missing_embedding(&self.pool, limit).await?;
        Ok(rows.into_iter().map(EmbeddingCandidate::from).collect())
    }

    async fn deal_set_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, DbError> {
        deals::set_deal_embedding(&self.pool, id, embedding).await
    }

    async fn deal_record_embedding_failure(&self, id: i64) -> Result<(), DbError> {
        deals::record_embedding_failure(&self.pool, id).await
    }
}
