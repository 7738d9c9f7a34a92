use sqlx::{SqlitePool, sqlite::SqlitePoolOptions, Row};
use std::time::Duration;
use tracing::{info, error};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as test")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database health check failed: {}", e);
                AppError::from(e)
            })?;

        let test_value: i32 = row.try_get("test")
            .map_err(AppError::from)?;

        if test_value == 1 {
            Ok(())
        } else {
            Err(AppError::Database("Unexpected health check result".to_string()))
        }
    }
}

pub async fn get_database_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    info!("Connecting to database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(database_url)
        .await
        .map_err(|e| {
            error!("Failed to create database pool: {}", e);
            AppError::from(e)
        })?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .map_err(AppError::from)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await
        .map_err(AppError::from)?;

    sqlx::query("PRAGMA busy_timeout = 30000")
        .execute(&pool)
        .await
        .map_err(AppError::from)?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Single-connection pool over a private in-memory database.
///
/// Every SQLite connection to `:memory:` opens a separate database, so the
/// pool is pinned to one connection that never idles out.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection() {
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());

        let pool = get_database_pool(&database_url, 2).await.unwrap();
        let db_manager = DatabaseManager::new(pool);

        db_manager.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_state() {
        let pool = connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t (v) VALUES (7)").execute(&pool).await.unwrap();

        let row = sqlx::query("SELECT v FROM t").fetch_one(&pool).await.unwrap();
        assert_eq!(row.get::<i64, _>("v"), 7);
    }
}
