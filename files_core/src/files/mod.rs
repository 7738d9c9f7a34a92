pub mod access;
pub mod listing;
pub mod manager;
pub mod models;
pub mod repository;
pub mod storage;
pub mod upload;

pub use listing::{ListingEngine, DEFAULT_PAGE_SIZE};
pub use manager::FileManager;
pub use models::{
    FileChanges, FileContent, FileFilter, FileId, FileNode, FileNodeView, FileType, NewFileNode,
    ParentRef, UploadRequest,
};
pub use repository::{FileRepositoryTrait, MemoryFileRepository, SqliteFileRepository};
pub use storage::{BlobStore, LocalBlobStore};
pub use upload::UploadPipeline;
