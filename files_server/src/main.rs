//! Main entry point for the files server binary

use anyhow::Result;
use files_core::{
    create_app, get_database_pool, run_migrations, run_server, spawn_job_logger,
    spawn_session_purger, AppConfig, AppState, ChannelJobQueue,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!("Blob storage directory: {}", config.files.storage_dir.display());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let pool = get_database_pool(&config.database.url, config.database.max_connections).await
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;

    run_migrations(pool.clone()).await
        .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {}", e))?;
    info!("Database initialized: {}", config.database.url);

    let (job_queue, job_receiver) = ChannelJobQueue::new();
    let job_logger = spawn_job_logger(job_receiver);

    let state = AppState::with_sqlite(pool, &config, Arc::new(job_queue));
    info!("App: {} v{}", state.app_name, state.version);
    info!("Session store: {:?}", config.auth.session_store);

    let session_purger = spawn_session_purger(
        state.auth_service.sessions().clone(),
        config.auth.session_purge_interval(),
    );

    let app = create_app(state);

    run_server(app, addr).await?;
    session_purger.abort();

    // The router owned the last queue sender, so the logger now drains and exits.
    match job_logger.await {
        Ok(handled) => info!("Job consumer stopped after {} jobs", handled),
        Err(e) => tracing::warn!("Job consumer task failed: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!(
                "files_core={level},{}={level},tower_http=debug",
                env!("CARGO_CRATE_NAME").replace('-', "_"),
                level = default_level
            ).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
