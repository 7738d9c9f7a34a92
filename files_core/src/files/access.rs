//! Read/write permission checks for nodes.
//!
//! Callers that are denied read must report the node as not found.

use crate::auth::UserId;
use super::models::FileNode;

pub fn can_read(node: &FileNode, caller: Option<UserId>) -> bool {
    node.is_public || caller == Some(node.user_id)
}

pub fn can_write(node: &FileNode, caller: UserId) -> bool {
    caller == node.user_id
}
