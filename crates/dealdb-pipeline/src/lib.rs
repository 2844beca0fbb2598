//! The deal acquisition pipeline.
//!
//! Four batch stages, each a plain async function over a [`DealStore`] and
//! whichever external client it needs:
//!
//! | Stage | Entry point |
//! |---|---|
//! | Ingestion | [`run_ingestion`] |
//! | Extraction | [`run_extraction`] |
//! | Embedding backfill | [`run_embedding_backfill`] |
//! | Retention | [`run_retention`] |
//!
//! Stages never schedule themselves and never run items in parallel; a
//! dispatcher decides when to call them, usually through [`PipelineRunner`],
//! which also records each run in the `pipeline_runs` ledger.
//!
//! [`DealStore`]: dealdb_db::DealStore

pub mod clients;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod ledger;
pub mod retention;
pub mod runner;
pub mod validate;

pub use clients::{ContentSource, Embedder, Extractor};
pub use embedding::{compose_text, run_embedding_backfill, EmbeddingSummary};
pub use error::PipelineError;
pub use extraction::{
    run_extraction, ExtractionCounts, ExtractionSummary, ProcessedDeal, SkippedDeal,
};
pub use ingestion::{run_ingestion, IngestionSummary};
pub use ledger::{run_recorded, StageSummary};
pub use retention::{run_retention, RetentionSummary};
pub use runner::PipelineRunner;
pub use validate::{evaluate, SkipReason, Verdict};
