use std::path::Path;

use async_trait::async_trait;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Filesystem contract for blob content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn ensure_directory(&self, path: &Path) -> Result<()>;
    /// Returns only once the bytes are flushed to stable storage.
    async fn write_durable(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    /// `None` when nothing exists at `path`.
    async fn read_all(&self, path: &Path) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBlobStore;

impl LocalBlobStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        async_fs::create_dir_all(path).await.map_err(|e| {
            AppError::Storage(format!("Failed to create directory {}: {}", path.display(), e))
        })
    }

    async fn write_durable(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let write = async {
            let mut file = async_fs::File::create(path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await
        };

        write.await.map_err(|e| {
            AppError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn read_all(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match async_fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
