//! Path resolution for the recipe store.
//!
//! Every user-supplied path passes through [`resolve`] before the filesystem is
//! touched. Paths arrive already percent-decoded (once, by the HTTP extractors)
//! and are never decoded again. Rules for logical paths:
//! - '/' separated, relative; a leading '/' or a drive prefix is rejected
//! - `..` segments are rejected outright, `.` and empty segments collapse
//! - NUL, '\\' and control characters are rejected (plus `<>:"|?*` on Windows)
//! - segments are NFC-normalized
//!
//! Containment is checked after canonicalization (symlinks resolved) with a
//! component-wise prefix test, so `/data/recipes2` never passes for `/data/recipes`.
//!
//! A resolved path keeps two locations: [`ResolvedPath::abs`] follows every
//! symlink and is where content is read and written, [`ResolvedPath::entry`]
//! stops at the last segment so deletes and renames act on the name the user gave.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use super::error::{StoreError, StoreResult};

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// A user path that has been validated against the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    logical: String,
    abs: PathBuf,
    entry: PathBuf,
    link: bool,
    root: bool,
}

impl ResolvedPath {
    /// Normalized slash-separated path relative to the root ("" for the root).
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Canonical absolute location on disk.
    pub fn abs(&self) -> &Path {
        &self.abs
    }

    /// The named entry itself: canonical parent plus the last segment, the
    /// final symlink (if any) not followed.
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// True when the last segment is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.link
    }

    /// True when the path lands on the root itself, including through a symlink.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Last segment of the logical path.
    pub fn name(&self) -> &str {
        self.logical.rsplit('/').next().unwrap_or("")
    }
}

fn is_illegal_char(c: char) -> bool {
    if c == '\0' || c == '\\' || c.is_control() {
        return true;
    }
    cfg!(windows) && matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*')
}

fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!((chars.next(), chars.next()), (Some(d), Some(':')) if d.is_ascii_alphabetic())
}

/// Validate a decoded logical path and split it into NFC-normalized segments.
/// An empty result denotes the root.
pub fn logical_segments(path: &str) -> StoreResult<Vec<String>> {
    if path.starts_with('/') || has_drive_prefix(path) {
        return Err(StoreError::invalid_path(path, "absolute paths are not allowed"));
    }
    let mut segs = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            return Err(StoreError::invalid_path(path, "'..' segments are not allowed"));
        }
        if seg.chars().any(is_illegal_char) {
            return Err(StoreError::invalid_path(path, "segment contains an illegal character"));
        }
        segs.push(normalize_nfc(seg));
    }
    Ok(segs)
}

/// Component-wise prefix test. `prefix` itself counts as inside.
pub fn is_prefix_path(path: &Path, prefix: &Path) -> bool {
    if cfg!(windows) {
        let pr = path.components().next();
        let rr = prefix.components().next();
        if pr != rr {
            return false;
        }
    }
    path.starts_with(prefix)
}

/// Canonicalize the longest existing ancestor of `joined` and re-append the
/// segments that do not exist yet. Dangling symlinks are refused since a later
/// write would follow them.
fn canonicalize_existing_prefix(joined: &Path, logical: &str) -> StoreResult<PathBuf> {
    let mut pending: Vec<OsString> = Vec::new();
    let mut cur = joined.to_path_buf();
    loop {
        match fs::canonicalize(&cur) {
            Ok(mut canon) => {
                if !pending.is_empty() && !canon.is_dir() {
                    return Err(StoreError::invalid_op(logical, "an ancestor is not a directory"));
                }
                for seg in pending.iter().rev() {
                    canon.push(seg);
                }
                return Ok(canon);
            }
            Err(e) => {
                let is_link = fs::symlink_metadata(&cur)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if is_link {
                    return Err(StoreError::invalid_path(logical, "path crosses a dangling symlink"));
                }
                if e.kind() != io::ErrorKind::NotFound && fs::symlink_metadata(&cur).is_ok() {
                    return Err(StoreError::io("canonicalize", logical, e));
                }
                match cur.file_name() {
                    Some(name) => pending.push(name.to_os_string()),
                    None => return Err(StoreError::invalid_path(logical, "path has no existing ancestor")),
                }
                if !cur.pop() {
                    return Err(StoreError::invalid_path(logical, "path has no existing ancestor"));
                }
            }
        }
    }
}

/// Resolve an untrusted logical path against `base`.
///
/// Succeeds with the root itself for an empty path; use [`resolve_file`] where
/// the root is not an acceptable target.
pub fn resolve(base: &Path, path: &str) -> StoreResult<ResolvedPath> {
    let segments = logical_segments(path)?;
    let canon_base = fs::canonicalize(base).map_err(|e| StoreError::io("canonicalize", "", e))?;
    let logical = segments.join("/");

    let mut joined = canon_base.clone();
    for seg in &segments {
        joined.push(seg);
    }
    let abs = canonicalize_existing_prefix(&joined, &logical)?;
    if !is_prefix_path(&abs, &canon_base) {
        return Err(StoreError::invalid_path(path, "path escapes the store root"));
    }
    let root = abs == canon_base;

    let link = fs::symlink_metadata(&joined)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    let entry = match (link, joined.parent(), joined.file_name()) {
        (true, Some(parent), Some(leaf)) => {
            let mut entry = fs::canonicalize(parent).map_err(|e| StoreError::io("canonicalize", logical.as_str(), e))?;
            if !is_prefix_path(&entry, &canon_base) {
                return Err(StoreError::invalid_path(path, "path escapes the store root"));
            }
            entry.push(leaf);
            entry
        }
        _ => abs.clone(),
    };
    Ok(ResolvedPath { logical, abs, entry, link, root })
}

/// Resolve a path that must name something strictly inside the root.
pub fn resolve_file(base: &Path, path: &str) -> StoreResult<ResolvedPath> {
    let resolved = resolve(base, path)?;
    if resolved.is_root() {
        return Err(StoreError::invalid_path(path, "path must not be empty"));
    }
    Ok(resolved)
}
