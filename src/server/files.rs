//! Handlers for `/api/files`, `/api/directories` and `/api/recipes`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{blocking, AppJson, AppState};
use crate::error::{AppError, AppResult};
use crate::store::recipes::ensure_recipe_suffix;
use crate::store::{DirectoryEntry, FileRecord, FileStamp, MoveOutcome, TreeNode};

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WritePayload {
    pub content: String,
    /// Version the client last saw. Absent means unconditional overwrite.
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayload {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MovePayload {
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipeUpdatePayload {
    pub content: String,
    #[serde(default)]
    pub version: Option<String>,
}

const MOVE_SUFFIX: &str = "/move";

pub async fn list_files(State(state): State<AppState>, Query(q): Query<PathQuery>) -> AppResult<Json<Vec<DirectoryEntry>>> {
    let store = state.store.clone();
    let entries = blocking(move || store.list(&q.path)).await?;
    Ok(Json(entries))
}

pub async fn read_file(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<FileRecord>> {
    let store = state.store.clone();
    let rec = blocking(move || store.read(&path)).await?;
    Ok(Json(rec))
}

pub async fn write_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    AppJson(payload): AppJson<WritePayload>,
) -> AppResult<Json<FileStamp>> {
    let store = state.store.clone();
    let rec = blocking(move || store.write(&path, &payload.content, payload.version.as_deref())).await?;
    Ok(Json(FileStamp::from(&rec)))
}

/// POST on a file path creates it; POST on `<path>/move` with a `destination`
/// moves it. The suffix alone is not enough, so a file literally named `move`
/// can still be created.
pub async fn create_or_move(
    State(state): State<AppState>,
    Path(path): Path<String>,
    AppJson(body): AppJson<Value>,
) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    if let Some(source) = path.strip_suffix(MOVE_SUFFIX) {
        if body.get("destination").is_some() {
            let req: MovePayload = serde_json::from_value(body)
                .map_err(|e| AppError::user("bad_request".to_string(), e.to_string()))?;
            let source = source.to_string();
            debug!(target: "http", from = %source, to = %req.destination, "move requested");
            let outcome: MoveOutcome = blocking(move || store.move_entry(&source, &req.destination)).await?;
            return Ok(Json(json!(outcome)));
        }
    }
    let req: CreatePayload = serde_json::from_value(body)
        .map_err(|e| AppError::user("bad_request".to_string(), e.to_string()))?;
    let rec = blocking(move || store.create(&path, &req.content)).await?;
    Ok(Json(json!(FileStamp::from(&rec))))
}

pub async fn delete_file(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    blocking(move || store.delete(&path)).await?;
    Ok(Json(json!({"status": "ok"})))
}

pub async fn directory_tree(State(state): State<AppState>, Query(q): Query<PathQuery>) -> AppResult<Json<TreeNode>> {
    let store = state.store.clone();
    let tree = blocking(move || store.tree(&q.path)).await?;
    Ok(Json(tree))
}

pub async fn create_directory(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    let shown = path.clone();
    blocking(move || store.create_directory(&path)).await?;
    Ok(Json(json!({"status": "ok", "path": shown})))
}

/// Recursive and irreversible; the UI confirms before calling.
pub async fn delete_directory(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    blocking(move || store.delete_directory(&path)).await?;
    Ok(Json(json!({"status": "ok"})))
}

pub async fn save_recipe(
    State(state): State<AppState>,
    Path(path): Path<String>,
    AppJson(payload): AppJson<RecipeUpdatePayload>,
) -> AppResult<Json<FileStamp>> {
    let store = state.store.clone();
    let path = ensure_recipe_suffix(&path);
    let rec = blocking(move || store.write(&path, &payload.content, payload.version.as_deref())).await?;
    Ok(Json(FileStamp::from(&rec)))
}

pub async fn create_recipe(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<FileStamp>> {
    let store = state.store.clone();
    let rec = blocking(move || store.create_recipe(&path)).await?;
    Ok(Json(FileStamp::from(&rec)))
}

/// Multipart upload of a text file: a `path` field naming the target and a
/// `file` field with its bytes. Overwrites unconditionally; bytes must be UTF-8.
pub async fn upload_file(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<FileStamp>> {
    let mut form = form?;
    let mut path: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    while let Some(field) = form.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("path") => path = Some(field.text().await?),
            Some("file") => bytes = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }
    let path = path.ok_or_else(|| AppError::user("bad_request", "missing form field 'path'"))?;
    let bytes = bytes.ok_or_else(|| AppError::user("bad_request", "missing form field 'file'"))?;
    debug!(target: "http", path = %path, size = bytes.len(), "upload");

    let store = state.store.clone();
    let rec = blocking(move || store.write_bytes(&path, &bytes)).await?;
    Ok(Json(FileStamp::from(&rec)))
}
