use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::UserId;

use crate::extractors::{lenient_bool, lenient_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileType::Folder)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(format!("Invalid file type: {}", s)),
        }
    }
}

/// Where a node hangs in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentRef {
    #[default]
    Root,
    Folder(FileId),
}

impl ParentRef {
    /// Wire form: `"0"` is root, anything else must be a node id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "0" {
            return Some(ParentRef::Root);
        }
        raw.parse().ok().map(ParentRef::Folder)
    }

    /// Accepts the JSON shapes clients send: absent/null, `0`, `"0"` or an id string.
    pub fn from_json(value: Option<&serde_json::Value>) -> Option<Self> {
        match value {
            None | Some(serde_json::Value::Null) => Some(ParentRef::Root),
            Some(serde_json::Value::Number(n)) if n.as_u64() == Some(0) => Some(ParentRef::Root),
            Some(serde_json::Value::String(s)) => Self::parse(s),
            Some(_) => None,
        }
    }

    pub fn folder_id(&self) -> Option<FileId> {
        match self {
            ParentRef::Root => None,
            ParentRef::Folder(id) => Some(*id),
        }
    }
}

impl Serialize for ParentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParentRef::Root => serializer.serialize_u8(0),
            ParentRef::Folder(id) => serializer.collect_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub id: FileId,
    pub user_id: UserId,
    pub name: String,
    pub file_type: FileType,
    pub is_public: bool,
    pub parent: ParentRef,
    /// Blob location. Never set on folders.
    pub local_path: Option<String>,
}

impl FileNode {
    pub fn view(&self) -> FileNodeView {
        FileNodeView::from(self.clone())
    }
}

/// A node record before the store has assigned its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileNode {
    pub user_id: UserId,
    pub name: String,
    pub file_type: FileType,
    pub is_public: bool,
    pub parent: ParentRef,
    pub local_path: Option<String>,
}

impl NewFileNode {
    pub fn folder(user_id: UserId, name: impl Into<String>, parent: ParentRef, is_public: bool) -> Self {
        Self {
            user_id,
            name: name.into(),
            file_type: FileType::Folder,
            is_public,
            parent,
            local_path: None,
        }
    }

    pub fn with_id(self, id: FileId) -> FileNode {
        FileNode {
            id,
            user_id: self.user_id,
            name: self.name,
            file_type: self.file_type,
            is_public: self.is_public,
            parent: self.parent,
            local_path: self.local_path,
        }
    }
}

/// Public projection of a node. The blob path is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNodeView {
    pub id: FileId,
    pub user_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: ParentRef,
}

impl From<FileNode> for FileNodeView {
    fn from(node: FileNode) -> Self {
        Self {
            id: node.id,
            user_id: node.user_id,
            name: node.name,
            file_type: node.file_type,
            is_public: node.is_public,
            parent_id: node.parent,
        }
    }
}

/// Equality filter over node attributes; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFilter {
    pub id: Option<FileId>,
    pub user_id: Option<UserId>,
    pub parent: Option<ParentRef>,
}

impl FileFilter {
    pub fn by_id(id: FileId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn owned_by(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn under(mut self, parent: ParentRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn matches(&self, node: &FileNode) -> bool {
        self.id.map_or(true, |id| node.id == id)
            && self.user_id.map_or(true, |user_id| node.user_id == user_id)
            && self.parent.map_or(true, |parent| node.parent == parent)
    }
}

/// The only mutable attribute of a stored node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FileChanges {
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub file_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_public: Option<bool>,
    pub parent_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub content_type: String,
}
