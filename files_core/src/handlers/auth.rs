use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::auth::models::{CreateUserRequest, TokenResponse, UserResponse};
use crate::error::AppError;
use crate::extractors::LenientJson;
use crate::middleware::auth::{extract_token, AuthUser};
use crate::AppState;

pub async fn register_user(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state
        .auth_service
        .register_user(request.email.as_deref(), request.password.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchanges `Authorization: Basic base64(email:password)` for a session token.
pub async fn connect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let (email, password) = basic_credentials(&headers).ok_or(AppError::Unauthorized)?;
    let token = state.auth_service.issue_token(&email, &password).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = extract_token(&headers).ok_or(AppError::Unauthorized)?;
    state.auth_service.revoke_token(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth_service
        .get_user_by_id(auth_user.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?.trim();

    let decoded = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Malformed basic credentials: {}", e);
            return None;
        }
    };
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;

    Some((email.to_string(), password.to_string()))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/me", get(get_current_user))
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect))
}
