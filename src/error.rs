//! Application error model at the HTTP boundary.
//! Store errors are mapped here and nowhere else; raw OS error text is logged,
//! never put on the wire.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    InvalidPath { code: String, message: String },
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    AlreadyExists { code: String, message: String },
    /// Lost-update conflict; carries the server copy so the client can offer
    /// overwrite or reload.
    VersionConflict {
        code: String,
        message: String,
        path: String,
        expected_version: String,
        current_version: String,
        current_content: String,
    },
    Encoding { code: String, message: String },
    PayloadTooLarge { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::InvalidPath { code, .. }
            | AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::AlreadyExists { code, .. }
            | AppError::VersionConflict { code, .. }
            | AppError::Encoding { code, .. }
            | AppError::PayloadTooLarge { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidPath { message, .. }
            | AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::AlreadyExists { message, .. }
            | AppError::VersionConflict { message, .. }
            | AppError::Encoding { message, .. }
            | AppError::PayloadTooLarge { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidPath { .. } => 400,
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::AlreadyExists { .. } => 409,
            AppError::VersionConflict { .. } => 409,
            AppError::Encoding { .. } => 422,
            AppError::PayloadTooLarge { .. } => 413,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPath { path, reason } => AppError::InvalidPath {
                code: "invalid_path".into(),
                message: format!("invalid path '{path}': {reason}"),
            },
            StoreError::NotFound { path } => AppError::NotFound {
                code: "not_found".into(),
                message: format!("'{path}' not found"),
            },
            StoreError::AlreadyExists { path } => AppError::AlreadyExists {
                code: "already_exists".into(),
                message: format!("'{path}' already exists"),
            },
            StoreError::VersionConflict { path, expected_version, current_version, current_content } => {
                AppError::VersionConflict {
                    code: "version_conflict".into(),
                    message: format!("'{path}' was modified since version {expected_version}"),
                    path,
                    expected_version,
                    current_version,
                    current_content,
                }
            }
            StoreError::Encoding { path } => AppError::Encoding {
                code: "encoding_error".into(),
                message: format!("'{path}' is not valid UTF-8 text"),
            },
            StoreError::InvalidOperation { path, reason } => AppError::UserInput {
                code: "invalid_operation".into(),
                message: format!("'{path}': {reason}"),
            },
            StoreError::PayloadTooLarge { size, limit } => AppError::PayloadTooLarge {
                code: "payload_too_large".into(),
                message: format!("{size} bytes exceeds the {limit} byte limit"),
            },
            StoreError::Io { op, path, source } => {
                error!(target: "http", op, path = %path, error = %source, "storage io failure");
                AppError::Internal { code: "io_error".into(), message: format!("storage error during {op}") }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        AppError::UserInput { code: "bad_request".into(), message: rej.body_text() }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rej: MultipartRejection) -> Self {
        AppError::UserInput { code: "bad_request".into(), message: rej.body_text() }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::UserInput { code: "bad_request".into(), message: err.body_text() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
