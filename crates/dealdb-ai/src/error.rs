use thiserror::Error;

/// Errors returned by the AI provider clients.
#[derive(Debug, Error)]
pub enum AiError {
    /// Transport-level failure (connect, timeout, reset) from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429: the provider asked us to slow down.
    #[error("rate limited by AI provider")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("AI provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response without the expected content.
    #[error("AI response contained no content")]
    MissingContent,

    /// The response body could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The embeddings response carried no vector.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The embedding length does not match the configured dimensions.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
