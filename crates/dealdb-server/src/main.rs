mod api;
mod dispatch;
mod middleware;
mod scheduler;

use std::sync::Arc;

use dealdb_core::CronSchedule;
use dealdb_pipeline::PipelineRunner;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    dispatch::Dispatcher,
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dealdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dealdb_db::PoolConfig::from_app_config(&config);
    let pool = dealdb_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = dealdb_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let runner = PipelineRunner::from_app_config(pool.clone(), &config)?;
    let dispatcher = Arc::new(Dispatcher::new(runner, &config));

    let _scheduler = scheduler::build_scheduler(
        Arc::clone(&dispatcher),
        &CronSchedule::from_app_config(&config),
    )
    .await?;

    let auth = AuthState::from_keys(
        &config.api_keys,
        matches!(config.env, dealdb_core::Environment::Development),
    )?;
    let app = build_app(AppState { pool, dispatcher }, auth, default_rate_limit_state());

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "dealdb-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
