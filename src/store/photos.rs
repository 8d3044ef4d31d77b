//! JPEG photo sidecars: `desserts/cake.md` owns `desserts/cake.jpeg`.
//!
//! Sidecars are hidden from listings and follow their recipe on delete and
//! move. Those follow-ups are best effort: a failed sidecar step is logged and
//! never fails the recipe operation itself.

use std::fs;
use std::io::Write;

use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::paths::ResolvedPath;
use super::RecipeStore;

pub const PHOTO_EXTENSION: &str = "jpeg";
pub const RECIPE_EXTENSION: &str = "md";
pub const MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

pub fn is_recipe_path(logical: &str) -> bool {
    logical.ends_with(".md")
}

pub fn is_photo_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case(PHOTO_EXTENSION))
        .unwrap_or(false)
}

/// Logical path of the photo belonging to a recipe path.
pub fn photo_logical_path(recipe_logical: &str) -> String {
    let (dir, name) = match recipe_logical.rsplit_once('/') {
        Some((d, n)) => (Some(d), n),
        None => (None, recipe_logical),
    };
    let stem = match name.rsplit_once('.') {
        Some((s, _)) if !s.is_empty() => s,
        _ => name,
    };
    match dir {
        Some(d) => format!("{d}/{stem}.{PHOTO_EXTENSION}"),
        None => format!("{stem}.{PHOTO_EXTENSION}"),
    }
}

impl RecipeStore {
    fn photo_target(&self, recipe_path: &str) -> StoreResult<ResolvedPath> {
        let recipe = self.resolve_file(recipe_path)?;
        self.resolve_file(&photo_logical_path(recipe.logical()))
    }

    pub fn read_photo(&self, recipe_path: &str) -> StoreResult<Vec<u8>> {
        let photo = self.photo_target(recipe_path)?;
        if !photo.abs().is_file() {
            return Err(StoreError::not_found(photo.logical()));
        }
        fs::read(photo.abs()).map_err(|e| StoreError::io("read_photo", photo.logical(), e))
    }

    /// Store a JPEG next to its recipe, replacing any previous photo.
    /// Returns the photo's logical path.
    pub fn write_photo(&self, recipe_path: &str, bytes: &[u8]) -> StoreResult<String> {
        let size = bytes.len() as u64;
        if size > MAX_PHOTO_BYTES {
            return Err(StoreError::PayloadTooLarge { size, limit: MAX_PHOTO_BYTES });
        }
        let photo = self.photo_target(recipe_path)?;
        if bytes.is_empty() || !bytes.starts_with(&JPEG_MAGIC) {
            return Err(StoreError::invalid_op(photo.logical(), "photo must be a non-empty JPEG image"));
        }
        let parent = photo
            .abs()
            .parent()
            .ok_or_else(|| StoreError::invalid_path(photo.logical(), "path has no parent"))?;
        fs::create_dir_all(parent).map_err(|e| StoreError::io("create_parent", photo.logical(), e))?;
        let mut staged = tempfile::Builder::new()
            .prefix(super::ops::STAGING_PREFIX)
            .suffix(super::ops::STAGING_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| StoreError::io("stage", photo.logical(), e))?;
        staged
            .write_all(bytes)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| StoreError::io("stage", photo.logical(), e))?;
        staged
            .persist(photo.abs())
            .map_err(|e| StoreError::io("persist", photo.logical(), e.error))?;
        info!(target: "store", photo = %photo.logical(), size, "photo saved");
        Ok(photo.logical().to_string())
    }

    pub fn delete_photo(&self, recipe_path: &str) -> StoreResult<()> {
        let photo = self.photo_target(recipe_path)?;
        if !photo.abs().is_file() {
            return Err(StoreError::not_found(photo.logical()));
        }
        fs::remove_file(photo.entry()).map_err(|e| StoreError::io("delete_photo", photo.logical(), e))?;
        info!(target: "store", photo = %photo.logical(), "photo deleted");
        Ok(())
    }

    pub(crate) fn remove_photo_sidecar(&self, recipe: &ResolvedPath) {
        match self.delete_photo(recipe.logical()) {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => warn!(target: "store", recipe = %recipe.logical(), error = %e, "failed to delete photo sidecar"),
        }
    }

    pub(crate) fn move_photo_sidecar(&self, from: &ResolvedPath, to: &ResolvedPath) {
        let moved = (|| -> StoreResult<bool> {
            let old = self.resolve_file(&photo_logical_path(from.logical()))?;
            if !old.abs().is_file() {
                return Ok(false);
            }
            let new = self.resolve_file(&photo_logical_path(to.logical()))?;
            if fs::symlink_metadata(new.entry()).is_ok() {
                return Err(StoreError::already_exists(new.logical()));
            }
            fs::rename(old.entry(), new.entry()).map_err(|e| StoreError::io("move_photo", old.logical(), e))?;
            Ok(true)
        })();
        match moved {
            Ok(true) => info!(target: "store", from = %from.logical(), to = %to.logical(), "photo moved with recipe"),
            Ok(false) => {}
            Err(e) => warn!(target: "store", from = %from.logical(), to = %to.logical(), error = %e, "failed to move photo sidecar"),
        }
    }
}
