use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Row, Sqlite, SqlitePool,
};

use crate::error::{AppError, Result};
use super::models::{FileChanges, FileFilter, FileId, FileNode, FileType, NewFileNode, ParentRef};

/// Document-store contract for node metadata.
///
/// `aggregate` returns matches in insertion order.
#[async_trait]
pub trait FileRepositoryTrait: Send + Sync {
    async fn find_one(&self, filter: &FileFilter) -> Result<Option<FileNode>>;
    async fn insert_one(&self, node: NewFileNode) -> Result<FileNode>;
    async fn update_one(&self, filter: &FileFilter, changes: FileChanges) -> Result<u64>;
    async fn aggregate(&self, filter: &FileFilter, skip: u64, limit: u64) -> Result<Vec<FileNode>>;
    async fn count(&self) -> Result<u64>;
}

const NODE_COLUMNS: &str = "id, user_id, name, type, is_public, parent_id, local_path";

#[derive(Clone)]
pub struct SqliteFileRepository {
    pool: SqlitePool,
}

impl SqliteFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &FileFilter) -> String {
        let mut conditions = Vec::new();

        if filter.id.is_some() {
            conditions.push("id = ?");
        }

        if filter.user_id.is_some() {
            conditions.push("user_id = ?");
        }

        match filter.parent {
            Some(ParentRef::Root) => conditions.push("parent_id IS NULL"),
            Some(ParentRef::Folder(_)) => conditions.push("parent_id = ?"),
            None => {}
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        }
    }

    fn bind_filter<'q>(
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
        filter: &FileFilter,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        if let Some(id) = filter.id {
            query = query.bind(id.to_string());
        }

        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id);
        }

        if let Some(ParentRef::Folder(parent)) = filter.parent {
            query = query.bind(parent.to_string());
        }

        query
    }

    fn node_from_row(row: &SqliteRow) -> Result<FileNode> {
        let id: String = row.get("id");
        let file_type: String = row.get("type");
        let parent_id: Option<String> = row.get("parent_id");

        let parent = match parent_id {
            None => ParentRef::Root,
            Some(raw) => ParentRef::Folder(raw.parse().map_err(|e| {
                AppError::Database(format!("Invalid parent id {}: {}", raw, e))
            })?),
        };

        Ok(FileNode {
            id: id
                .parse()
                .map_err(|e| AppError::Database(format!("Invalid file id {}: {}", id, e)))?,
            user_id: row.get("user_id"),
            name: row.get("name"),
            file_type: file_type.parse::<FileType>().map_err(AppError::Database)?,
            is_public: row.get("is_public"),
            parent,
            local_path: row.get("local_path"),
        })
    }
}

#[async_trait]
impl FileRepositoryTrait for SqliteFileRepository {
    async fn find_one(&self, filter: &FileFilter) -> Result<Option<FileNode>> {
        let sql = format!(
            "SELECT {} FROM files{} ORDER BY seq LIMIT 1",
            NODE_COLUMNS,
            Self::where_clause(filter)
        );

        let row = Self::bind_filter(sqlx::query(&sql), filter)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::node_from_row).transpose()
    }

    async fn insert_one(&self, node: NewFileNode) -> Result<FileNode> {
        let node = node.with_id(FileId::new());

        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, name, type, is_public, parent_id, local_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.user_id)
        .bind(&node.name)
        .bind(node.file_type.as_str())
        .bind(node.is_public)
        .bind(node.parent.folder_id().map(|id| id.to_string()))
        .bind(&node.local_path)
        .execute(&self.pool)
        .await?;

        Ok(node)
    }

    async fn update_one(&self, filter: &FileFilter, changes: FileChanges) -> Result<u64> {
        let is_public = match changes.is_public {
            Some(is_public) => is_public,
            None => return Ok(0),
        };

        let sql = format!(
            "UPDATE files SET is_public = ? WHERE seq = (SELECT seq FROM files{} ORDER BY seq LIMIT 1)",
            Self::where_clause(filter)
        );

        let query = sqlx::query(&sql).bind(is_public);
        let rows_affected = Self::bind_filter(query, filter)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn aggregate(&self, filter: &FileFilter, skip: u64, limit: u64) -> Result<Vec<FileNode>> {
        let sql = format!(
            "SELECT {} FROM files{} ORDER BY seq LIMIT ? OFFSET ?",
            NODE_COLUMNS,
            Self::where_clause(filter)
        );

        let rows = Self::bind_filter(sqlx::query(&sql), filter)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::node_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM files")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count") as u64)
    }
}

/// Insertion-ordered in-process store.
#[derive(Clone, Default)]
pub struct MemoryFileRepository {
    nodes: Arc<RwLock<Vec<FileNode>>>,
}

impl MemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<FileNode> {
        self.nodes.read().clone()
    }
}

#[async_trait]
impl FileRepositoryTrait for MemoryFileRepository {
    async fn find_one(&self, filter: &FileFilter) -> Result<Option<FileNode>> {
        Ok(self.nodes.read().iter().find(|n| filter.matches(n)).cloned())
    }

    async fn insert_one(&self, node: NewFileNode) -> Result<FileNode> {
        let node = node.with_id(FileId::new());
        self.nodes.write().push(node.clone());
        Ok(node)
    }

    async fn update_one(&self, filter: &FileFilter, changes: FileChanges) -> Result<u64> {
        let mut nodes = self.nodes.write();
        match nodes.iter_mut().find(|n| filter.matches(n)) {
            Some(node) => {
                if let Some(is_public) = changes.is_public {
                    node.is_public = is_public;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn aggregate(&self, filter: &FileFilter, skip: u64, limit: u64) -> Result<Vec<FileNode>> {
        Ok(self
            .nodes
            .read()
            .iter()
            .filter(|n| filter.matches(n))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.nodes.read().len() as u64)
    }
}
