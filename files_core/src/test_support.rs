use std::sync::Arc;

use tempfile::TempDir;

use crate::config::AppConfig;
use crate::database::{connect_in_memory, run_migrations};
use crate::jobs::ChannelJobQueue;
use crate::AppState;

/// SQLite-backed state over an in-memory database with blobs under a
/// fresh temporary directory. Keep the directory alive for the test.
pub(crate) async fn test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = connect_in_memory().await.unwrap();
    run_migrations(pool.clone()).await.unwrap();

    let mut config = AppConfig::default();
    config.files.storage_dir = dir.path().to_path_buf();

    let (queue, _receiver) = ChannelJobQueue::new();
    (AppState::with_sqlite(pool, &config, Arc::new(queue)), dir)
}
