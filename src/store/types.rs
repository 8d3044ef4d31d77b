//! Data contracts returned by the store. Purely types/serde and light helpers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// One stored text file as seen at a single point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    /// Opaque version token, see `version::version_for_bytes`.
    pub version: String,
    pub size: u64,
    /// RFC 3339, UTC.
    pub last_modified: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// A FileRecord without its content, returned by write-style calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileStamp {
    pub path: String,
    pub version: String,
    pub size: u64,
    pub last_modified: String,
}

impl From<&FileRecord> for FileStamp {
    fn from(r: &FileRecord) -> Self {
        FileStamp {
            path: r.path.clone(),
            version: r.version.clone(),
            size: r.size,
            last_modified: r.last_modified.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Shallow directory tree: a node plus its children, directory children
/// carrying their own sub-directories one level down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl From<DirectoryEntry> for TreeNode {
    fn from(e: DirectoryEntry) -> Self {
        TreeNode { name: e.name, path: e.path, kind: e.kind, size: e.size, children: Vec::new() }
    }
}

/// Result of a move: files report their new version, directories do not have one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
