use crate::auth::models::{User, UserId};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn count(&self) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
        let created_at: String = row.get("created_at");

        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: created_at.parse().map_err(|e| {
                AppError::Database(format!("Failed to parse created_at: {}", e))
            })?,
        })
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::BadRequest("Already exist".to_string())
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get user by ID: {}", e)))?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get user by email: {}", e)))?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn count(&self) -> Result<u64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to count users: {}", e)))?;

        Ok(row.get::<i64, _>("count") as u64)
    }
}
