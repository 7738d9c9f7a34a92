//! Upload pipeline.
//!
//! A non-folder upload is a two-step protocol across two stores:
//!
//! 1. the decoded blob is durably written under the storage directory;
//! 2. the metadata record pointing at it is inserted.
//!
//! Nothing spans the two steps. A failure after step 1 leaves an orphan blob
//! that no record references; a failure in step 1 leaves no record at all.
//! A record therefore never points at a path without data.

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, warn};

use crate::auth::UserId;
use crate::error::{AppError, Result};
use crate::jobs::{DerivativeJob, JobQueue};
use super::manager::FileManager;
use super::models::{FileId, FileNodeView, FileType, ParentRef, UploadRequest};
use super::storage::BlobStore;

#[derive(Clone)]
pub struct UploadPipeline {
    files: FileManager,
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn JobQueue>,
    storage_dir: PathBuf,
}

/// A request that passed field validation.
struct ValidatedUpload {
    name: String,
    file_type: FileType,
    data: Option<String>,
    is_public: bool,
    parent: ParentRef,
}

impl UploadPipeline {
    pub fn new(
        files: FileManager,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            files,
            blobs,
            jobs,
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    /// Runs one upload for an already resolved caller.
    pub async fn upload(&self, user_id: UserId, request: UploadRequest) -> Result<FileNodeView> {
        let upload = Self::validate(request)?;

        self.files.validate_parent(upload.parent).await?;

        if upload.file_type.is_folder() {
            let folder = self
                .files
                .create_folder(user_id, &upload.name, upload.parent, upload.is_public)
                .await?;
            return Ok(folder.view());
        }

        let bytes = STANDARD
            .decode(upload.data.as_deref().unwrap_or_default())
            .map_err(|_| AppError::MissingField("data"))?;

        let local_path = self.persist_blob(&bytes).await?;

        let node = self
            .files
            .create_file_record(
                user_id,
                &upload.name,
                upload.file_type,
                upload.parent,
                upload.is_public,
                local_path,
            )
            .await?;

        info!("Accepted {} upload {} ({} bytes)", node.file_type, node.id, bytes.len());

        let job = DerivativeJob {
            user_id,
            file_id: node.id,
        };
        if let Err(e) = self.jobs.enqueue(job) {
            warn!("Failed to enqueue derivative job for {}: {}", node.id, e);
        }

        Ok(node.view())
    }

    fn validate(request: UploadRequest) -> Result<ValidatedUpload> {
        let name = request
            .name
            .filter(|name| !name.is_empty())
            .ok_or(AppError::MissingField("name"))?;

        let file_type = request
            .file_type
            .as_deref()
            .and_then(|t| t.parse::<FileType>().ok())
            .ok_or(AppError::MissingField("type"))?;

        let data = request.data.filter(|data| !data.is_empty());
        if data.is_none() && !file_type.is_folder() {
            return Err(AppError::MissingField("data"));
        }

        let parent = ParentRef::from_json(request.parent_id.as_ref()).ok_or(AppError::ParentNotFound)?;

        Ok(ValidatedUpload {
            name,
            file_type,
            data,
            is_public: request.is_public.unwrap_or(false),
            parent,
        })
    }

    /// Step 1 of the protocol. Returns the path holding the written bytes.
    async fn persist_blob(&self, bytes: &[u8]) -> Result<String> {
        let path = self.storage_dir.join(FileId::new().to_string());

        self.blobs.ensure_directory(&self.storage_dir).await?;
        self.blobs.write_durable(&path, bytes).await?;

        Ok(path.to_string_lossy().to_string())
    }
}
