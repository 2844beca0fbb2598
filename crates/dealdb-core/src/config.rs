use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_SOURCES: &str = "SaaS,microsaas,SideProject,EntrepreneurRideAlong";
const DEFAULT_USER_AGENT: &str = "dealdb/0.1 (deal-acquisition)";

/// Width of the `deals.embedding` column. Must match the `vector(N)` in the migrations.
pub const EMBEDDING_COLUMN_DIMENSIONS: usize = 1536;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns [`ConfigError`] if `DATABASE_URL` is missing or any variable
/// fails to parse or validate.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let vars = Vars(lookup);

    let database_url = vars.require("DATABASE_URL")?;
    let env = parse_environment(&vars.text("DEALDB_ENV", "development"))?;

    let bind_addr = vars.parse("DEALDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = vars.text("DEALDB_LOG_LEVEL", "info");
    let api_keys = split_list(&vars.text("DEALDB_API_KEYS", ""));

    let db_max_connections = vars.parse("DEALDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = vars.parse("DEALDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = vars.parse("DEALDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let sources = split_list(&vars.text("DEALDB_SOURCES", DEFAULT_SOURCES));
    if sources.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "DEALDB_SOURCES".to_string(),
            reason: "at least one source name is required".to_string(),
        });
    }
    let source_page_size = vars.parse("DEALDB_SOURCE_PAGE_SIZE", "10")?;
    let source_period = vars.text("DEALDB_SOURCE_PERIOD", "day");
    let reddit_base_url = vars.text("REDDIT_BASE_URL", "https://www.reddit.com");
    let reddit_user_agent = vars.text("REDDIT_USER_AGENT", DEFAULT_USER_AGENT);
    let source_request_timeout_secs = vars.parse("DEALDB_SOURCE_REQUEST_TIMEOUT_SECS", "30")?;

    let ai_api_key = vars
        .get("DEALDB_AI_API_KEY")
        .filter(|k| !k.trim().is_empty());
    let ai_base_url = vars.text("DEALDB_AI_BASE_URL", "https://api.openai.com/v1");
    let extraction_model = vars.text("DEALDB_EXTRACTION_MODEL", "gpt-4o-mini");
    let embedding_model = vars.text("DEALDB_EMBEDDING_MODEL", "text-embedding-3-small");
    let embedding_dimensions = vars.parse("DEALDB_EMBEDDING_DIMENSIONS", "1536")?;
    if embedding_dimensions != EMBEDDING_COLUMN_DIMENSIONS {
        return Err(ConfigError::InvalidEnvVar {
            var: "DEALDB_EMBEDDING_DIMENSIONS".to_string(),
            reason: format!(
                "embedding column holds {EMBEDDING_COLUMN_DIMENSIONS} dimensions, got {embedding_dimensions}"
            ),
        });
    }
    let ai_max_attempts = vars.at_least(1, "DEALDB_AI_MAX_ATTEMPTS", "3")?;
    let ai_backoff_ms = vars.parse("DEALDB_AI_BACKOFF_MS", "1000")?;
    let ai_request_timeout_secs = vars.parse("DEALDB_AI_REQUEST_TIMEOUT_SECS", "60")?;

    let extract_batch_scheduled = vars.at_least(1, "DEALDB_EXTRACT_BATCH_SCHEDULED", "2")?;
    let extract_batch_on_demand = vars.at_least(1, "DEALDB_EXTRACT_BATCH_ON_DEMAND", "3")?;
    let embed_batch = vars.at_least(1, "DEALDB_EMBED_BATCH", "3")?;

    let cron_ingest = vars.text("DEALDB_CRON_INGEST", "0 0 */6 * * *");
    let cron_extract = vars.text("DEALDB_CRON_EXTRACT", "0 */10 * * * *");
    let cron_embed = vars.text("DEALDB_CRON_EMBED", "0 5/15 * * * *");
    let cron_retention = vars.text("DEALDB_CRON_RETENTION", "0 30 3 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        sources,
        source_page_size,
        source_period,
        reddit_base_url,
        reddit_user_agent,
        source_request_timeout_secs,
        ai_api_key,
        ai_base_url,
        extraction_model,
        embedding_model,
        embedding_dimensions,
        ai_max_attempts,
        ai_backoff_ms,
        ai_request_timeout_secs,
        extract_batch_scheduled,
        extract_batch_on_demand,
        embed_batch,
        cron_ingest,
        cron_extract,
        cron_embed,
        cron_retention,
    })
}

/// Typed access to one variable source.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).ok()
    }

    fn require(&self, var: &str) -> Result<String, ConfigError> {
        self.get(var)
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn text(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.text(var, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    /// Like [`Vars::parse`] but rejects values below `min`.
    fn at_least<T>(&self, min: T, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Display,
        T::Err: Display,
    {
        let value: T = self.parse(var, default)?;
        if value < min {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("must be >= {min}, got {value}"),
            });
        }
        Ok(value)
    }
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DEALDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
