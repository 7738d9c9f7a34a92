//! Core library containing the file and session services and their HTTP surface.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extractors;
pub mod files;
pub mod handlers;
pub mod jobs;
pub mod middleware;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{
    spawn_session_purger, AuthService, MemorySessionStore, SessionStore, SqliteSessionStore,
    UserRepository, UserRepositoryTrait,
};
pub use crate::config::{AppConfig, SessionBackend};
pub use database::{connect_in_memory, get_database_pool, run_migrations, DatabaseManager};
pub use error::{AppError, Result};
pub use files::{
    BlobStore, FileManager, FileRepositoryTrait, ListingEngine, LocalBlobStore,
    MemoryFileRepository, SqliteFileRepository, UploadPipeline,
};
pub use handlers::routes::create_routes;
pub use jobs::{spawn_job_logger, ChannelJobQueue, DerivativeJob, JobQueue};
pub use middleware::auth::{token_auth_middleware, AuthUser, OptionalAuthUser};

use axum::{middleware as axum_middleware, Router};
use sqlx::SqlitePool;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub db_manager: Option<DatabaseManager>,
    pub auth_service: AuthService,
    pub file_manager: FileManager,
    pub upload_pipeline: UploadPipeline,
    pub listing: ListingEngine,
}

impl AppState {
    /// Assembles the components from explicitly supplied adapters.
    pub fn new(
        auth_service: AuthService,
        repository: Arc<dyn FileRepositoryTrait>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
        files: &crate::config::FileConfig,
    ) -> Self {
        let file_manager = FileManager::new(repository.clone(), blobs.clone());
        let upload_pipeline =
            UploadPipeline::new(file_manager.clone(), blobs, jobs, files.storage_dir.clone());
        let listing = ListingEngine::new(repository).with_page_size(files.page_size);

        Self {
            app_name: "Files Manager".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            db_manager: None,
            auth_service,
            file_manager,
            upload_pipeline,
            listing,
        }
    }

    /// Production wiring: users and nodes in SQLite, sessions per
    /// `auth.session_store`, blobs on the local filesystem.
    pub fn with_sqlite(pool: SqlitePool, config: &AppConfig, jobs: Arc<dyn JobQueue>) -> Self {
        let sessions: Arc<dyn SessionStore> = match config.auth.session_store {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
            SessionBackend::Database => Arc::new(SqliteSessionStore::new(pool.clone())),
        };

        let auth_service = AuthService::new(Arc::new(UserRepository::new(pool.clone())), sessions)
            .with_token_ttl(config.auth.token_ttl());

        let mut state = Self::new(
            auth_service,
            Arc::new(SqliteFileRepository::new(pool.clone())),
            Arc::new(LocalBlobStore::new()),
            jobs,
            &config.files,
        );
        state.db_manager = Some(DatabaseManager::new(pool));
        state
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::token_auth_middleware,
        ))
        .layer(middleware::logging::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
