//! Typed failures raised by the file store. The HTTP layer owns the mapping to
//! status codes (see `crate::error`); nothing in here knows about HTTP.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Traversal attempt, absolute path, illegal characters or a path that
    /// canonicalizes outside the root.
    #[error("invalid path: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// The caller's version no longer matches disk. Carries the server side so
    /// the caller can choose between overwrite and reload.
    #[error("version conflict on {path}: expected {expected_version}, found {current_version}")]
    VersionConflict {
        path: String,
        expected_version: String,
        current_version: String,
        current_content: String,
    },

    #[error("file is not valid UTF-8: {path}")]
    Encoding { path: String },

    /// Structurally valid path, but the operation does not apply to it
    /// (deleting a directory through the file API, moving onto itself, ...).
    #[error("invalid operation on {path}: {reason}")]
    InvalidOperation { path: String, reason: String },

    #[error("payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Raw OS error. The message can contain host paths and must not be sent
    /// to clients as-is.
    #[error("io error during {op} on {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidPath { path: path.into(), reason: reason.into() }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound { path: path.into() }
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        StoreError::AlreadyExists { path: path.into() }
    }

    pub fn invalid_op(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidOperation { path: path.into(), reason: reason.into() }
    }

    /// Wrap an io::Error, folding the kinds that have a dedicated variant.
    pub fn io(op: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            io::ErrorKind::AlreadyExists => StoreError::AlreadyExists { path },
            _ => StoreError::Io { op, path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
