use crate::auth::models::{User, UserId, UserResponse};
use crate::auth::repository::UserRepositoryTrait;
use crate::auth::session::SessionStore;
use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session-store key prefix for token mappings.
pub const AUTH_KEY_PREFIX: &str = "auth_";

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex");
}

fn session_key(token: &str) -> String {
    format!("{}{}", AUTH_KEY_PREFIX, token)
}

#[derive(Clone)]
pub struct AuthService {
    user_repository: Arc<dyn UserRepositoryTrait>,
    sessions: Arc<dyn SessionStore>,
    argon2: Argon2<'static>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepositoryTrait>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            user_repository,
            sessions,
            argon2: Argon2::default(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub async fn register_user(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserResponse, AppError> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingField("email"))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AppError::MissingField("password"))?;

        if !EMAIL_REGEX.is_match(email) {
            return Err(AppError::BadRequest("Invalid email".to_string()));
        }

        if self.user_repository.get_user_by_email(email).await?.is_some() {
            return Err(AppError::BadRequest("Already exist".to_string()));
        }

        let password_hash = self.hash_password(password)?;
        let user = self.user_repository.create_user(email, &password_hash).await?;

        info!("Registered user {}", user.id);
        Ok(UserResponse::from(user))
    }

    /// Exchanges credentials for a fresh session token.
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repository
            .get_user_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !self.verify_password(password, &user.password_hash)? {
            warn!("Credential mismatch for user {}", user.id);
            return Err(AppError::Unauthorized);
        }

        let token = Uuid::new_v4().to_string();
        self.sessions
            .set(&session_key(&token), &user.id.to_string(), self.token_ttl)
            .await?;

        info!("Issued session token for user {}", user.id);
        Ok(token)
    }

    /// Fails with `Unauthorized` when the token is unknown, expired or already revoked.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        let key = session_key(token);

        let user_id = self
            .sessions
            .get(&key)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !self.sessions.del(&key).await? {
            return Err(AppError::Unauthorized);
        }

        info!("Revoked session token for user {}", user_id);
        Ok(())
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Option<UserId>, AppError> {
        let value = match self.sessions.get(&session_key(token)).await? {
            Some(value) => value,
            None => return Ok(None),
        };

        match value.parse::<UserId>() {
            Ok(user_id) => Ok(Some(user_id)),
            Err(_) => {
                warn!("Session entry holds a malformed user id");
                Ok(None)
            }
        }
    }

    /// Resolves a token to its user record. A token whose user no longer exists is invalid.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AppError> {
        let user_id = match self.resolve_token(token).await? {
            Some(user_id) => user_id,
            None => return Ok(None),
        };

        let user = self.user_repository.get_user_by_id(user_id).await?;
        if user.is_none() {
            debug!("Session token refers to missing user {}", user_id);
        }
        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<UserResponse>, AppError> {
        let user = self.user_repository.get_user_by_id(user_id).await?;
        Ok(user.map(UserResponse::from))
    }

    pub async fn count_users(&self) -> Result<u64, AppError> {
        self.user_repository.count().await
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Other(anyhow::anyhow!("Failed to hash password: {}", e)))?;

        Ok(password_hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Other(anyhow::anyhow!("Invalid password hash: {}", e)))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
