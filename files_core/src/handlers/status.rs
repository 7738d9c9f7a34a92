use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusResponse {
    pub db: bool,
    pub sessions: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatsResponse {
    pub users: u64,
    pub files: u64,
}

/// Liveness of the two backing stores.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let db = match &state.db_manager {
        Some(db_manager) => db_manager.health_check().await.is_ok(),
        None => true,
    };

    let sessions = match state.auth_service.sessions().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Session store ping failed: {}", e);
            false
        }
    };

    Json(StatusResponse { db, sessions })
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let users = state.auth_service.count_users().await?;
    let files = state.file_manager.repository().count().await?;
    Ok(Json(StatsResponse { users, files }))
}

pub fn create_status_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/stats", get(get_stats))
}
