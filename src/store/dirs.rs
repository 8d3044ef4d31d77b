//! Directory service: list, create, delete (recursive), move, shallow tree.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::ops::is_staging_name;
use super::paths::is_prefix_path;
use super::photos::is_photo_name;
use super::types::{DirectoryEntry, EntryKind, TreeNode};
use super::{join_logical, RecipeStore};

/// Entries listings never show: photo sidecars and staged temp files.
pub(crate) fn is_hidden_file(name: &str) -> bool {
    is_photo_name(name) || is_staging_name(name)
}

/// Remove a symlink itself. Windows keeps directory links as directories.
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path).or_else(|e| if cfg!(windows) { fs::remove_dir(path) } else { Err(e) })
}

/// Directories before files, each alphabetical.
fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
}

impl RecipeStore {
    /// List the immediate children of a directory. A directory that does not
    /// exist lists as empty; a file is not listable.
    pub fn list(&self, path: &str) -> StoreResult<Vec<DirectoryEntry>> {
        let dir = self.resolve(path)?;
        let meta = match fs::metadata(dir.abs()) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("stat", dir.logical(), e)),
        };
        if !meta.is_dir() {
            return Err(StoreError::invalid_op(dir.logical(), "path is not a directory"));
        }

        let mut out = Vec::new();
        let rd = fs::read_dir(dir.abs()).map_err(|e| StoreError::io("list", dir.logical(), e))?;
        for ent in rd {
            let ent = ent.map_err(|e| StoreError::io("list", dir.logical(), e))?;
            let name = match ent.file_name().into_string() {
                Ok(n) => n,
                Err(raw) => {
                    debug!(target: "store", dir = %dir.logical(), name = ?raw, "skipping non UTF-8 entry");
                    continue;
                }
            };
            // Symlinks are listed only when their target stays inside the root.
            if ent.file_type().map(|t| t.is_symlink()).unwrap_or(false) {
                let inside = fs::canonicalize(ent.path())
                    .map(|target| is_prefix_path(&target, &self.root))
                    .unwrap_or(false);
                if !inside {
                    debug!(target: "store", dir = %dir.logical(), name = %name, "skipping symlink leading outside the root");
                    continue;
                }
            }
            let Ok(m) = fs::metadata(ent.path()) else { continue };
            let (kind, size) = if m.is_dir() {
                (EntryKind::Directory, None)
            } else {
                if is_hidden_file(&name) {
                    continue;
                }
                (EntryKind::File, Some(m.len()))
            };
            let path = join_logical(dir.logical(), &name);
            out.push(DirectoryEntry { name, path, kind, size });
        }
        sort_entries(&mut out);
        debug!(target: "store", dir = %dir.logical(), entries = out.len(), "list");
        Ok(out)
    }

    /// Create a directory, including missing ancestors.
    pub fn create_directory(&self, path: &str) -> StoreResult<()> {
        let dir = self.resolve_file(path)?;
        if fs::symlink_metadata(dir.entry()).is_ok() {
            return Err(StoreError::already_exists(dir.logical()));
        }
        fs::create_dir_all(dir.abs()).map_err(|e| StoreError::io("create_directory", dir.logical(), e))?;
        info!(target: "store", dir = %dir.logical(), "directory created");
        Ok(())
    }

    /// Delete a directory and everything below it. Destructive and not
    /// reversible; callers are expected to have confirmed with the user.
    /// A symlink to a directory is unlinked; nothing behind it is touched.
    pub fn delete_directory(&self, path: &str) -> StoreResult<()> {
        let dir = self.resolve_file(path)?;
        fs::symlink_metadata(dir.entry()).map_err(|e| StoreError::io("stat", dir.logical(), e))?;
        if !dir.abs().is_dir() {
            return Err(StoreError::invalid_op(dir.logical(), "path is not a directory"));
        }
        if dir.is_symlink() {
            remove_link(dir.entry()).map_err(|e| StoreError::io("delete_directory", dir.logical(), e))?;
            info!(target: "store", dir = %dir.logical(), "directory link removed");
            return Ok(());
        }
        fs::remove_dir_all(dir.abs()).map_err(|e| StoreError::io("delete_directory", dir.logical(), e))?;
        info!(target: "store", dir = %dir.logical(), "directory deleted recursively");
        Ok(())
    }

    /// Move a directory. Everything is validated before the single rename:
    /// moving into itself or onto an existing path mutates nothing.
    /// Returns the new logical path.
    pub fn move_directory(&self, source: &str, destination: &str) -> StoreResult<String> {
        let from = self.resolve_file(source)?;
        let to = self.resolve_file(destination)?;
        fs::symlink_metadata(from.entry()).map_err(|e| StoreError::io("stat", from.logical(), e))?;
        if from.is_symlink() {
            return Err(StoreError::invalid_op(from.logical(), "symbolic links cannot be moved"));
        }
        if !from.abs().is_dir() {
            return Err(StoreError::invalid_op(from.logical(), "path is not a directory"));
        }
        if is_prefix_path(to.abs(), from.abs()) {
            return Err(StoreError::invalid_path(to.logical(), "destination is inside the source directory"));
        }
        if fs::symlink_metadata(to.entry()).is_ok() {
            return Err(StoreError::already_exists(to.logical()));
        }
        if let Some(parent) = to.entry().parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create_parent", to.logical(), e))?;
        }
        fs::rename(from.entry(), to.entry()).map_err(|e| StoreError::io("rename", from.logical(), e))?;
        info!(target: "store", from = %from.logical(), to = %to.logical(), "directory moved");
        Ok(to.logical().to_string())
    }

    /// Node for `path` with its children; directory children carry their own
    /// sub-directories one level down.
    pub fn tree(&self, path: &str) -> StoreResult<TreeNode> {
        let dir = self.resolve(path)?;
        let name = if dir.logical().is_empty() {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            dir.name().to_string()
        };
        let mut children = Vec::new();
        for entry in self.list(dir.logical())? {
            let mut node = TreeNode::from(entry);
            if node.kind == EntryKind::Directory {
                node.children = self
                    .list(&node.path)?
                    .into_iter()
                    .filter(|e| e.kind == EntryKind::Directory)
                    .map(TreeNode::from)
                    .collect();
            }
            children.push(node);
        }
        Ok(TreeNode { name, path: dir.logical().to_string(), kind: EntryKind::Directory, size: None, children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, RecipeStore) {
        let tmp = tempdir().unwrap();
        let store = RecipeStore::open(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn list_orders_directories_first_and_hides_sidecars() {
        let (_tmp, store) = store();
        store.write("b.md", "b", None).unwrap();
        store.write("a.md", "a", None).unwrap();
        store.create_directory("zeta").unwrap();
        store.create_directory("alpha").unwrap();
        fs::write(store.root().join("a.jpeg"), [0xFF, 0xD8, 0xFF]).unwrap();
        fs::write(store.root().join(".~abc.tmp"), "x").unwrap();

        let names: Vec<_> = store.list("").unwrap().into_iter().map(|e| (e.name, e.kind)).collect();
        assert_eq!(names, vec![
            ("alpha".to_string(), EntryKind::Directory),
            ("zeta".to_string(), EntryKind::Directory),
            ("a.md".to_string(), EntryKind::File),
            ("b.md".to_string(), EntryKind::File),
        ]);
    }

    #[test]
    fn list_reports_paths_relative_to_root() {
        let (_tmp, store) = store();
        store.write("desserts/cake.md", "x", None).unwrap();
        let entries = store.list("desserts").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "desserts/cake.md");
        assert_eq!(entries[0].size, Some(1));
        assert!(store.list("nowhere").unwrap().is_empty());
        assert!(matches!(store.list("desserts/cake.md").unwrap_err(), StoreError::InvalidOperation { .. }));
        assert!(matches!(store.list("../").unwrap_err(), StoreError::InvalidPath { .. }));
    }

    #[test]
    fn create_and_delete_directories() {
        let (_tmp, store) = store();
        store.create_directory("a/b/c").unwrap();
        assert!(matches!(store.create_directory("a/b").unwrap_err(), StoreError::AlreadyExists { .. }));
        store.write("a/b/c/r.md", "x", None).unwrap();
        store.delete_directory("a").unwrap();
        assert!(!store.root().join("a").exists());
        assert!(store.delete_directory("a").unwrap_err().is_not_found());
        assert!(matches!(store.delete_directory("").unwrap_err(), StoreError::InvalidPath { .. }));
    }

    #[test]
    fn moving_directory_into_itself_mutates_nothing() {
        let (_tmp, store) = store();
        store.write("a/sub/r.md", "x", None).unwrap();
        let err = store.move_directory("a", "a/sub/inner").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        let err = store.move_directory("a", "a").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert_eq!(store.read("a/sub/r.md").unwrap().content, "x");
        assert!(!store.root().join("a/sub/inner").exists());
    }

    #[test]
    fn move_directory_relocates_contents() {
        let (_tmp, store) = store();
        store.write("a/r.md", "x", None).unwrap();
        store.create_directory("taken").unwrap();
        assert!(matches!(store.move_directory("a", "taken").unwrap_err(), StoreError::AlreadyExists { .. }));
        assert_eq!(store.move_directory("a", "b/a2").unwrap(), "b/a2");
        assert_eq!(store.read("b/a2/r.md").unwrap().content, "x");
        assert!(!store.root().join("a").exists());
    }

    #[test]
    fn tree_is_two_levels_deep() {
        let (_tmp, store) = store();
        store.write("mains/pasta/deep/x.md", "x", None).unwrap();
        store.write("mains/stew.md", "s", None).unwrap();
        store.write("readme.md", "r", None).unwrap();
        let tree = store.tree("").unwrap();
        assert_eq!(tree.path, "");
        assert_eq!(tree.children.len(), 2);
        let mains = &tree.children[0];
        assert_eq!(mains.name, "mains");
        assert_eq!(mains.children.len(), 1);
        assert_eq!(mains.children[0].path, "mains/pasta");
        assert!(mains.children[0].children.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn deleting_a_directory_link_keeps_the_real_directory() {
        let (_tmp, store) = store();
        store.write("real/cake.md", "flour", None).unwrap();
        std::os::unix::fs::symlink(store.root().join("real"), store.root().join("alias")).unwrap();

        store.delete_directory("alias").unwrap();
        assert!(fs::symlink_metadata(store.root().join("alias")).is_err());
        assert_eq!(store.read("real/cake.md").unwrap().content, "flour");
    }

    #[cfg(unix)]
    #[test]
    fn moving_a_directory_link_is_rejected() {
        let (_tmp, store) = store();
        store.write("real/cake.md", "flour", None).unwrap();
        std::os::unix::fs::symlink(store.root().join("real"), store.root().join("alias")).unwrap();

        let err = store.move_directory("alias", "elsewhere").unwrap_err();
        assert!(matches!(err, StoreError::InvalidOperation { .. }));
        assert!(store.root().join("real/cake.md").is_file());
        assert!(!store.root().join("elsewhere").exists());
    }

    #[cfg(unix)]
    #[test]
    fn links_leading_outside_are_not_listed() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("recipes");
        fs::create_dir_all(outer.path().join("elsewhere")).unwrap();
        let store = RecipeStore::open(&root).unwrap();
        store.create_directory("mains").unwrap();
        store.create_directory("real").unwrap();
        std::os::unix::fs::symlink("../elsewhere", root.join("ext")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();

        let names: Vec<_> = store.list("").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["alias", "mains", "real"]);
        let tree = store.tree("").unwrap();
        assert_eq!(tree.children.len(), 3);
    }
}
