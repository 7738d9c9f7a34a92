use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::UserId;
use crate::error::AppError;
use crate::AppState;

pub const TOKEN_HEADER: &str = "x-token";

/// The caller resolved from the `X-Token` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

impl AuthUser {
    pub fn new(user_id: UserId, email: String) -> Self {
        Self { user_id, email }
    }
}

/// Resolves `X-Token` once per request and attaches an [`AuthUser`] when the
/// token maps to a live session of an existing user. Requests without a
/// valid token pass through anonymously; handlers decide whether that is
/// acceptable.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = extract_token(request.headers()) {
        match state.auth_service.authenticate(&token).await? {
            Some(user) => {
                request
                    .extensions_mut()
                    .insert(AuthUser::new(user.id, user.email));
            }
            None => debug!("Request carried an unknown or expired token"),
        }
    }

    Ok(next.run(request).await)
}

/// Extracts the session token from the request headers.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Caller that may be anonymous.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl OptionalAuthUser {
    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}
