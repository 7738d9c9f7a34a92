use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::UserId;
use crate::error::{AppError, Result};
use super::access;
use super::models::{
    FileChanges, FileContent, FileFilter, FileId, FileNode, FileType, NewFileNode, ParentRef,
};
use super::repository::FileRepositoryTrait;
use super::storage::BlobStore;

/// Owns the node hierarchy: creation with parent validation, lookups under
/// the read policy, visibility changes and blob retrieval.
#[derive(Clone)]
pub struct FileManager {
    repository: Arc<dyn FileRepositoryTrait>,
    blobs: Arc<dyn BlobStore>,
}

impl FileManager {
    pub fn new(repository: Arc<dyn FileRepositoryTrait>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repository, blobs }
    }

    pub fn repository(&self) -> &Arc<dyn FileRepositoryTrait> {
        &self.repository
    }

    /// Rejects a non-root parent that is missing or is not a folder.
    pub async fn validate_parent(&self, parent: ParentRef) -> Result<()> {
        let parent_id = match parent {
            ParentRef::Root => return Ok(()),
            ParentRef::Folder(id) => id,
        };

        let parent_node = self
            .repository
            .find_one(&FileFilter::by_id(parent_id))
            .await?
            .ok_or(AppError::ParentNotFound)?;

        if !parent_node.file_type.is_folder() {
            return Err(AppError::ParentNotFolder);
        }

        Ok(())
    }

    pub async fn create_folder(
        &self,
        user_id: UserId,
        name: &str,
        parent: ParentRef,
        is_public: bool,
    ) -> Result<FileNode> {
        if name.is_empty() {
            return Err(AppError::MissingField("name"));
        }
        self.validate_parent(parent).await?;

        let node = self
            .repository
            .insert_one(NewFileNode::folder(user_id, name, parent, is_public))
            .await?;

        info!("Created folder {} for user {}", node.id, user_id);
        Ok(node)
    }

    /// Persists metadata for a blob already written at `local_path`.
    pub async fn create_file_record(
        &self,
        user_id: UserId,
        name: &str,
        file_type: FileType,
        parent: ParentRef,
        is_public: bool,
        local_path: String,
    ) -> Result<FileNode> {
        if name.is_empty() {
            return Err(AppError::MissingField("name"));
        }
        if file_type.is_folder() {
            return Err(AppError::MissingField("type"));
        }
        self.validate_parent(parent).await?;

        let node = self
            .repository
            .insert_one(NewFileNode {
                user_id,
                name: name.to_string(),
                file_type,
                is_public,
                parent,
                local_path: Some(local_path),
            })
            .await?;

        info!("Created {} {} for user {}", file_type, node.id, user_id);
        Ok(node)
    }

    pub async fn get_by_id(&self, file_id: FileId, caller: Option<UserId>) -> Result<FileNode> {
        let node = self
            .repository
            .find_one(&FileFilter::by_id(file_id))
            .await?
            .ok_or(AppError::NotFound)?;

        if !access::can_read(&node, caller) {
            debug!("Read of {} denied, reporting as not found", file_id);
            return Err(AppError::NotFound);
        }

        Ok(node)
    }

    /// Idempotent: repeating a call with the same flag leaves the node unchanged.
    pub async fn set_published(
        &self,
        file_id: FileId,
        caller: UserId,
        is_public: bool,
    ) -> Result<FileNode> {
        let filter = FileFilter::by_id(file_id).owned_by(caller);

        let node = self
            .repository
            .find_one(&filter)
            .await?
            .ok_or(AppError::NotFound)?;

        if !access::can_write(&node, caller) {
            return Err(AppError::NotFound);
        }

        if node.is_public == is_public {
            return Ok(node);
        }

        self.repository
            .update_one(&filter, FileChanges { is_public: Some(is_public) })
            .await?;

        let updated = self
            .repository
            .find_one(&filter)
            .await?
            .ok_or(AppError::NotFound)?;

        info!("Set isPublic={} on {}", is_public, file_id);
        Ok(updated)
    }

    /// Reads a node's blob, or its `size` derivative when `size > 0`.
    pub async fn get_content(
        &self,
        file_id: FileId,
        caller: Option<UserId>,
        size: u32,
    ) -> Result<FileContent> {
        let node = self.get_by_id(file_id, caller).await?;

        if node.file_type.is_folder() {
            return Err(AppError::NotAFile);
        }

        let local_path = node.local_path.as_deref().ok_or_else(|| {
            AppError::Storage(format!("Node {} has no blob path", node.id))
        })?;

        let path = if size == 0 {
            local_path.to_string()
        } else {
            format!("{}_{}", local_path, size)
        };

        let data = self
            .blobs
            .read_all(Path::new(&path))
            .await?
            .ok_or(AppError::NotFound)?;

        let content_type = mime_guess::from_path(&node.name)
            .first_or_octet_stream()
            .to_string();

        Ok(FileContent { data, content_type })
    }
}
