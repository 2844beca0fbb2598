//! Shared domain types and configuration for the deal acquisition pipeline.

pub mod app_config;
pub mod config;
pub mod deals;
pub mod error;
pub mod pipeline_config;

pub use app_config::{AppConfig, Environment};
pub use config::{
    build_app_config, load_app_config, load_app_config_from_env, EMBEDDING_COLUMN_DIMENSIONS,
};
pub use deals::{
    EmbeddingCandidate, ExtractedFields, InsertOutcome, NewDeal, NewRawDeal, RawDeal, SourcePost,
};
pub use error::ConfigError;
pub use pipeline_config::{AiSettings, CronSchedule, PipelineConfig};
