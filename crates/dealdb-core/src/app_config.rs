use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings loaded once at startup from the environment.
///
/// Stages never read this directly; dispatchers derive a
/// [`crate::PipelineConfig`] and [`crate::AiSettings`] from it and pass those
/// into each invocation.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Content source
    pub sources: Vec<String>,
    pub source_page_size: u32,
    pub source_period: String,
    pub reddit_base_url: String,
    pub reddit_user_agent: String,
    pub source_request_timeout_secs: u64,

    // AI provider
    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub extraction_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub ai_max_attempts: u32,
    pub ai_backoff_ms: u64,
    pub ai_request_timeout_secs: u64,

    // Batch sizes
    pub extract_batch_scheduled: i64,
    pub extract_batch_on_demand: i64,
    pub embed_batch: i64,

    // Cron-to-stage mapping
    pub cron_ingest: String,
    pub cron_extract: String,
    pub cron_embed: String,
    pub cron_retention: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("sources", &self.sources)
            .field("source_page_size", &self.source_page_size)
            .field("source_period", &self.source_period)
            .field("reddit_base_url", &self.reddit_base_url)
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field(
                "source_request_timeout_secs",
                &self.source_request_timeout_secs,
            )
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_base_url", &self.ai_base_url)
            .field("extraction_model", &self.extraction_model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("ai_max_attempts", &self.ai_max_attempts)
            .field("ai_backoff_ms", &self.ai_backoff_ms)
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("extract_batch_scheduled", &self.extract_batch_scheduled)
            .field("extract_batch_on_demand", &self.extract_batch_on_demand)
            .field("embed_batch", &self.embed_batch)
            .field("cron_ingest", &self.cron_ingest)
            .field("cron_extract", &self.cron_extract)
            .field("cron_embed", &self.cron_embed)
            .field("cron_retention", &self.cron_retention)
            .finish()
    }
}
