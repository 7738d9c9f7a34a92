use axum::Router;

use super::{auth::create_auth_routes, files::create_file_routes, status::create_status_routes};
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(create_status_routes())
        .merge(create_auth_routes())
        .merge(create_file_routes())
}
