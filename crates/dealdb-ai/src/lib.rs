//! Clients for the generative AI provider.
//!
//! [`ExtractionClient`] turns a post into a schema-conformant JSON object,
//! [`EmbeddingClient`] turns composed deal text into a fixed-length vector.
//! Both route every HTTP call through the injectable [`RetryPolicy`].

pub mod embed;
pub mod error;
pub mod extract;
pub mod retry;
pub mod schema;

mod http;

pub use embed::EmbeddingClient;
pub use error::AiError;
pub use extract::{build_prompt, ExtractionClient};
pub use retry::RetryPolicy;
pub use schema::{response_schema, DealExtractionSchema};
