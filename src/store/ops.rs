//! Core file operations: read, write, create, delete, move.
//!
//! Writes stage the new bytes in a temp file next to the target and rename it
//! into place, so readers only ever see the old or the new content in full.
//! With an expected version the on-disk version is compared right before the
//! rename; the window between that check and the rename is the accepted race.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::paths::ResolvedPath;
use super::types::{EntryKind, FileRecord, MoveOutcome};
use super::version::{version_for_bytes, versions_match};
use super::{photos, RecipeStore};

/// Name prefix/suffix of staged temp files; listings and search skip them.
pub const STAGING_PREFIX: &str = ".~";
pub const STAGING_SUFFIX: &str = ".tmp";

pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

pub(crate) fn format_mtime(meta: &fs::Metadata) -> String {
    let ts: DateTime<Utc> = match meta.modified() {
        Ok(t) => t.into(),
        Err(_) => DateTime::<Utc>::UNIX_EPOCH,
    };
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn record_from_bytes(target: &ResolvedPath, bytes: Vec<u8>, meta: &fs::Metadata) -> StoreResult<FileRecord> {
    let version = version_for_bytes(&bytes);
    let size = bytes.len() as u64;
    let content = String::from_utf8(bytes)
        .map_err(|_| StoreError::Encoding { path: target.logical().to_string() })?;
    Ok(FileRecord {
        path: target.logical().to_string(),
        content,
        version,
        size,
        last_modified: format_mtime(meta),
        kind: EntryKind::File,
    })
}

/// Write `content` to a temp file in `dir` and flush it to disk.
fn stage(dir: &Path, content: &str, logical: &str) -> StoreResult<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| StoreError::io("stage", logical, e))?;
    staged
        .write_all(content.as_bytes())
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| StoreError::io("stage", logical, e))?;
    Ok(staged)
}

/// Create missing ancestors of `target` and return its parent directory.
fn ensure_parent<'a>(target: &'a ResolvedPath) -> StoreResult<&'a Path> {
    let parent = target
        .abs()
        .parent()
        .ok_or_else(|| StoreError::invalid_path(target.logical(), "path has no parent"))?;
    fs::create_dir_all(parent).map_err(|e| StoreError::io("create_parent", target.logical(), e))?;
    Ok(parent)
}

impl RecipeStore {
    pub(crate) fn read_resolved(&self, target: &ResolvedPath) -> StoreResult<FileRecord> {
        let meta = fs::metadata(target.abs()).map_err(|e| StoreError::io("stat", target.logical(), e))?;
        if !meta.is_file() {
            return Err(StoreError::not_found(target.logical()));
        }
        let bytes = fs::read(target.abs()).map_err(|e| StoreError::io("read", target.logical(), e))?;
        record_from_bytes(target, bytes, &meta)
    }

    /// Read a file and compute its current version.
    pub fn read(&self, path: &str) -> StoreResult<FileRecord> {
        let target = self.resolve_file(path)?;
        let rec = self.read_resolved(&target)?;
        debug!(target: "store", path = %rec.path, version = %rec.version, size = rec.size, "read");
        Ok(rec)
    }

    /// Persist `content` at `path`.
    ///
    /// With `expected_version` the file must exist and still carry that version,
    /// otherwise `VersionConflict` is returned with the current content and
    /// nothing is written. Without it the file is overwritten or created.
    /// Missing ancestor directories are created in both cases.
    pub fn write(&self, path: &str, content: &str, expected_version: Option<&str>) -> StoreResult<FileRecord> {
        let target = self.resolve_file(path)?;
        if target.abs().is_dir() {
            return Err(StoreError::invalid_op(target.logical(), "path is a directory"));
        }
        if expected_version.is_some() && !target.abs().is_file() {
            return Err(StoreError::not_found(target.logical()));
        }

        let dir = ensure_parent(&target)?;
        let staged = stage(dir, content, target.logical())?;

        if let Some(expected) = expected_version {
            let current = self.read_resolved(&target)?;
            if !versions_match(expected, &current.version) {
                info!(target: "store", path = %target.logical(), expected = %expected, current = %current.version, "write rejected: version conflict");
                return Err(StoreError::VersionConflict {
                    path: current.path,
                    expected_version: expected.to_string(),
                    current_version: current.version,
                    current_content: current.content,
                });
            }
        }

        staged
            .persist(target.abs())
            .map_err(|e| StoreError::io("persist", target.logical(), e.error))?;

        let meta = fs::metadata(target.abs()).map_err(|e| StoreError::io("stat", target.logical(), e))?;
        let rec = record_from_bytes(&target, content.as_bytes().to_vec(), &meta)?;
        info!(target: "store", path = %rec.path, version = %rec.version, size = rec.size, checked = expected_version.is_some(), "write");
        Ok(rec)
    }

    /// Create a new file. Fails with `AlreadyExists` rather than overwrite,
    /// including when another creator wins the race.
    pub fn create(&self, path: &str, initial_content: &str) -> StoreResult<FileRecord> {
        let target = self.resolve_file(path)?;
        if fs::symlink_metadata(target.entry()).is_ok() {
            return Err(StoreError::already_exists(target.logical()));
        }
        let dir = ensure_parent(&target)?;
        let staged = stage(dir, initial_content, target.logical())?;
        staged
            .persist_noclobber(target.abs())
            .map_err(|e| StoreError::io("persist", target.logical(), e.error))?;

        let meta = fs::metadata(target.abs()).map_err(|e| StoreError::io("stat", target.logical(), e))?;
        let rec = record_from_bytes(&target, initial_content.as_bytes().to_vec(), &meta)?;
        info!(target: "store", path = %rec.path, version = %rec.version, "create");
        Ok(rec)
    }

    /// Write raw bytes that must be UTF-8 text, e.g. an uploaded file.
    /// Unconditional, like [`RecipeStore::write`] without a version.
    pub fn write_bytes(&self, path: &str, bytes: &[u8]) -> StoreResult<FileRecord> {
        let content = std::str::from_utf8(bytes).map_err(|_| StoreError::Encoding { path: path.to_string() })?;
        self.write(path, content, None)
    }

    /// Delete a file. A recipe's photo sidecar goes with it. A symlink is
    /// removed itself; its target is left alone.
    pub fn delete(&self, path: &str) -> StoreResult<()> {
        let target = self.resolve_file(path)?;
        fs::symlink_metadata(target.entry()).map_err(|e| StoreError::io("stat", target.logical(), e))?;
        if target.abs().is_dir() {
            return Err(StoreError::invalid_op(target.logical(), "path is a directory"));
        }
        fs::remove_file(target.entry()).map_err(|e| StoreError::io("delete", target.logical(), e))?;
        if photos::is_recipe_path(target.logical()) {
            self.remove_photo_sidecar(&target);
        }
        info!(target: "store", path = %target.logical(), link = target.is_symlink(), "delete");
        Ok(())
    }

    /// Rename/relocate a file. Never overwrites; the returned record carries a
    /// freshly computed version. A recipe moved to a recipe path takes its photo along.
    /// Symlinks are not moved: a relative link would dangle at its new place.
    pub fn move_file(&self, source: &str, destination: &str) -> StoreResult<FileRecord> {
        let from = self.resolve_file(source)?;
        let to = self.resolve_file(destination)?;
        fs::symlink_metadata(from.entry()).map_err(|e| StoreError::io("stat", from.logical(), e))?;
        if from.is_symlink() {
            return Err(StoreError::invalid_op(from.logical(), "symbolic links cannot be moved"));
        }
        if from.abs().is_dir() {
            return Err(StoreError::invalid_op(from.logical(), "path is a directory"));
        }
        if from.entry() == to.entry() {
            return Err(StoreError::invalid_op(from.logical(), "source and destination are the same"));
        }
        if fs::symlink_metadata(to.entry()).is_ok() {
            return Err(StoreError::already_exists(to.logical()));
        }

        ensure_parent(&to)?;
        fs::rename(from.entry(), to.entry()).map_err(|e| StoreError::io("rename", from.logical(), e))?;
        if photos::is_recipe_path(from.logical()) && photos::is_recipe_path(to.logical()) {
            self.move_photo_sidecar(&from, &to);
        }

        let to = self.resolve_file(to.logical())?;
        let rec = self.read_resolved(&to)?;
        info!(target: "store", from = %from.logical(), to = %rec.path, version = %rec.version, "move");
        Ok(rec)
    }

    /// Move whatever lives at `source`: files via [`RecipeStore::move_file`],
    /// directories via [`RecipeStore::move_directory`].
    pub fn move_entry(&self, source: &str, destination: &str) -> StoreResult<MoveOutcome> {
        let from = self.resolve_file(source)?;
        fs::symlink_metadata(from.entry()).map_err(|e| StoreError::io("stat", from.logical(), e))?;
        if from.abs().is_dir() {
            let path = self.move_directory(source, destination)?;
            Ok(MoveOutcome { from: from.logical().to_string(), path, kind: EntryKind::Directory, version: None })
        } else {
            let rec = self.move_file(source, destination)?;
            Ok(MoveOutcome { from: from.logical().to_string(), path: rec.path, kind: EntryKind::File, version: Some(rec.version) })
        }
    }
}
