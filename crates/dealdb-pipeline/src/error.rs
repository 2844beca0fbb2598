use dealdb_ai::AiError;
use dealdb_core::ConfigError;
use dealdb_db::DbError;
use dealdb_sources::SourceError;
use thiserror::Error;

/// Unrecoverable stage or runner failure.
///
/// Source, extraction and embedding failures on individual posts are
/// recoverable and are reported in stage summaries instead; the `Source`
/// and `Ai` variants only arise while building clients.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("content source client error: {0}")]
    Source(#[from] SourceError),

    #[error("AI client error: {0}")]
    Ai(#[from] AiError),
}
