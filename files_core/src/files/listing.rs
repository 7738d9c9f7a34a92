use std::sync::Arc;

use tracing::debug;

use crate::auth::UserId;
use crate::error::Result;
use super::models::{FileFilter, FileNodeView, ParentRef};
use super::repository::FileRepositoryTrait;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Paginated, parent-scoped enumeration of a caller's nodes.
#[derive(Clone)]
pub struct ListingEngine {
    repository: Arc<dyn FileRepositoryTrait>,
    page_size: u64,
}

impl ListingEngine {
    pub fn new(repository: Arc<dyn FileRepositoryTrait>) -> Self {
        Self {
            repository,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Lists page `page` (zero-based) of the caller's nodes under `parent_id`.
    ///
    /// An absent or blank `parent_id` lists the root. A malformed, missing or
    /// non-folder parent yields an empty page rather than an error, as does a
    /// page past the end.
    pub async fn list(
        &self,
        user_id: UserId,
        parent_id: Option<&str>,
        page: u64,
    ) -> Result<Vec<FileNodeView>> {
        let parent = match parent_id.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => ParentRef::Root,
            Some(raw) => match ParentRef::parse(raw) {
                Some(parent) => parent,
                None => {
                    debug!("Listing with malformed parent id {:?}", raw);
                    return Ok(Vec::new());
                }
            },
        };

        if let ParentRef::Folder(folder_id) = parent {
            let folder = self.repository.find_one(&FileFilter::by_id(folder_id)).await?;
            if !folder.map_or(false, |f| f.file_type.is_folder()) {
                return Ok(Vec::new());
            }
        }

        let filter = FileFilter::default().owned_by(user_id).under(parent);
        let skip = page.saturating_mul(self.page_size);

        let nodes = self.repository.aggregate(&filter, skip, self.page_size).await?;
        Ok(nodes.into_iter().map(FileNodeView::from).collect())
    }
}
