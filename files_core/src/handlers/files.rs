use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    extractors::LenientJson,
    files::{FileId, FileNodeView, UploadRequest},
    middleware::auth::{AuthUser, OptionalAuthUser},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub parent_id: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    /// Unparseable or negative pages fall back to the first page.
    pub fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|page| page.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub size: Option<String>,
}

impl ContentQuery {
    /// A blank size selects the primary blob. A size that is not a
    /// non-negative integer names a derivative that cannot exist.
    pub fn size(&self) -> Result<u32> {
        match self.size.as_deref().map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse().map_err(|_| AppError::NotFound),
        }
    }
}

/// Path ids that are not well-formed can never name a node.
fn parse_file_id(raw: &str) -> Result<FileId> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub async fn upload_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    LenientJson(request): LenientJson<UploadRequest>,
) -> Result<(StatusCode, Json<FileNodeView>)> {
    let view = state.upload_pipeline.upload(auth_user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileNodeView>> {
    let file_id = parse_file_id(&id)?;
    let node = state.file_manager.get_by_id(file_id, Some(auth_user.user_id)).await?;
    Ok(Json(node.view()))
}

pub async fn list_files(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileNodeView>>> {
    let nodes = state
        .listing
        .list(auth_user.user_id, query.parent_id.as_deref(), query.page())
        .await?;
    Ok(Json(nodes))
}

pub async fn publish_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileNodeView>> {
    set_published(state, auth_user, &id, true).await
}

pub async fn unpublish_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileNodeView>> {
    set_published(state, auth_user, &id, false).await
}

async fn set_published(
    state: AppState,
    auth_user: AuthUser,
    id: &str,
    is_public: bool,
) -> Result<Json<FileNodeView>> {
    let file_id = parse_file_id(id)?;
    let node = state
        .file_manager
        .set_published(file_id, auth_user.user_id, is_public)
        .await?;
    Ok(Json(node.view()))
}

pub async fn get_file_data(
    State(state): State<AppState>,
    caller: OptionalAuthUser,
    Path(id): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<Response> {
    let file_id = parse_file_id(&id)?;
    let size = query.size()?;
    let content = state
        .file_manager
        .get_content(file_id, caller.user_id(), size)
        .await?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.data).into_response())
}

pub fn create_file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/:id", get(get_file))
        .route("/files/:id/publish", put(publish_file))
        .route("/files/:id/unpublish", put(unpublish_file))
        .route("/files/:id/data", get(get_file_data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parsing() {
        let page = |raw: Option<&str>| ListQuery {
            parent_id: None,
            page: raw.map(str::to_string),
        }
        .page();

        assert_eq!(page(None), 0);
        assert_eq!(page(Some("3")), 3);
        assert_eq!(page(Some("-1")), 0);
        assert_eq!(page(Some("abc")), 0);
    }

    #[test]
    fn test_size_parsing() {
        let size = |raw: Option<&str>| ContentQuery {
            size: raw.map(str::to_string),
        }
        .size();

        assert_eq!(size(None).unwrap(), 0);
        assert_eq!(size(Some("")).unwrap(), 0);
        assert_eq!(size(Some("250")).unwrap(), 250);
        for bad in ["abc", "-1", "1.5", "99999999999"] {
            assert!(matches!(size(Some(bad)), Err(AppError::NotFound)));
        }
    }

    #[test]
    fn test_malformed_path_id_is_not_found() {
        assert!(matches!(parse_file_id("123"), Err(AppError::NotFound)));
        assert!(parse_file_id(&FileId::new().to_string()).is_ok());
    }
}
