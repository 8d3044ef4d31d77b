//! Recipe file store: a directory tree of text files exposed through
//! validated logical paths, with optimistic concurrency on writes.
//!
//! There is deliberately no in-process cache or lock. Every call re-reads the
//! filesystem, and concurrent writers are told apart by version tokens only.

pub mod error;
pub mod paths;
pub mod types;
pub mod version;
pub mod ops;
pub mod dirs;
pub mod search;
pub mod photos;
pub mod recipes;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::{StoreError, StoreResult};
pub use paths::{normalize_nfc, logical_segments, resolve, resolve_file, ResolvedPath};
pub use types::{DirectoryEntry, EntryKind, FileRecord, FileStamp, MoveOutcome, TreeNode};
pub use version::{version_for_bytes, versions_match};
pub use search::{ContentMatch, FileMatch, MatchHit, MatchSpan, SearchOutcome};

/// Handle on a store rooted at one directory. Cheap to clone; holds nothing
/// but the canonical root.
#[derive(Debug, Clone)]
pub struct RecipeStore {
    root: PathBuf,
}

impl RecipeStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref();
        let shown = root.display().to_string();
        fs::create_dir_all(root).map_err(|e| StoreError::io("create_root", shown.clone(), e))?;
        let root = fs::canonicalize(root).map_err(|e| StoreError::io("canonicalize", shown, e))?;
        Ok(RecipeStore { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn resolve(&self, path: &str) -> StoreResult<ResolvedPath> {
        paths::resolve(&self.root, path)
    }

    pub(crate) fn resolve_file(&self, path: &str) -> StoreResult<ResolvedPath> {
        paths::resolve_file(&self.root, path)
    }
}

/// Join a parent logical path and a child name.
pub(crate) fn join_logical(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
