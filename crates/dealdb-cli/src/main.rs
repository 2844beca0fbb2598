mod status;

use clap::{Parser, Subcommand};
use dealdb_db::TriggerSource;
use dealdb_pipeline::PipelineRunner;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dealdb-cli")]
#[command(about = "Deal acquisition pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Pull top posts from every configured source into the raw store
    Ingest,
    /// Extract structured deals from unprocessed raw posts
    Extract {
        /// Raw posts to process; defaults to the on-demand batch size
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Compute embeddings for deals that have none
    Embed {
        /// Deals to embed; defaults to the configured embed batch size
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Delete raw posts that extraction has consumed
    Retain,
    /// Show store counts and the latest pipeline runs
    Status {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dealdb-cli: no command given; run with --help to list commands");
        return Ok(());
    };

    let config = dealdb_core::load_app_config()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = dealdb_db::connect_pool(
        &config.database_url,
        dealdb_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    let name = command.name();
    if let Err(e) = run_command(command, pool, &config).await {
        tracing::error!(command = name, error = %e, "command failed");
        return Err(e);
    }

    Ok(())
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Ingest => "ingest",
            Self::Extract { .. } => "extract",
            Self::Embed { .. } => "embed",
            Self::Retain => "retain",
            Self::Status { .. } => "status",
        }
    }
}

async fn run_command(
    command: Commands,
    pool: sqlx::PgPool,
    config: &dealdb_core::AppConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Migrate => {
            let applied = dealdb_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations up to date");
            println!("applied {applied} migration(s)");
        }
        Commands::Status { limit } => status::run_status(&pool, limit).await?,
        Commands::Ingest => {
            let runner = PipelineRunner::from_app_config(pool, config)?;
            print_summary(&runner.ingest(TriggerSource::Cli).await?)?;
        }
        Commands::Extract { batch_size } => {
            let batch_size = resolve_batch_size(batch_size, config.extract_batch_on_demand)?;
            let runner = PipelineRunner::from_app_config(pool, config)?;
            print_summary(&runner.extract(TriggerSource::Cli, batch_size).await?)?;
        }
        Commands::Embed { batch_size } => {
            let batch_size = resolve_batch_size(batch_size, config.embed_batch)?;
            let runner = PipelineRunner::from_app_config(pool, config)?;
            print_summary(&runner.embed(TriggerSource::Cli, batch_size).await?)?;
        }
        Commands::Retain => {
            let runner = PipelineRunner::from_app_config(pool, config)?;
            print_summary(&runner.retain(TriggerSource::Cli).await?)?;
        }
    }

    Ok(())
}

/// Explicit `--batch-size` wins over the configured default; it must be positive.
fn resolve_batch_size(flag: Option<i64>, default: i64) -> anyhow::Result<i64> {
    match flag {
        Some(n) if n < 1 => anyhow::bail!("--batch-size must be at least 1, got {n}"),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

fn print_summary<T: Serialize>(summary: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[cfg(test)]
mod tests;
