//! Content source clients for the deal acquisition pipeline.
//!
//! Pulls ranked posts from named Reddit communities and maps them into
//! [`dealdb_core::SourcePost`] values ready for ingestion.

pub mod error;
pub mod reddit;

mod listing;

pub use error::SourceError;
pub use reddit::RedditClient;
