//! Handlers for `/api/photos/{recipe}`: the JPEG sidecar of a recipe.
//! The recipe path gets `.md` appended when missing, like `/api/recipes`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use super::{blocking, AppState};
use crate::error::AppResult;
use crate::store::recipes::ensure_recipe_suffix;

pub async fn get_photo(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<impl IntoResponse> {
    let store = state.store.clone();
    let recipe = ensure_recipe_suffix(&path);
    let bytes = blocking(move || store.read_photo(&recipe)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    ))
}

/// Raw JPEG body; replaces any existing photo.
pub async fn upload_photo(State(state): State<AppState>, Path(path): Path<String>, body: Bytes) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    let recipe = ensure_recipe_suffix(&path);
    let shown = recipe.clone();
    let photo_path = blocking(move || store.write_photo(&recipe, &body)).await?;
    Ok(Json(json!({"status": "ok", "recipe_path": shown, "photo_path": photo_path})))
}

pub async fn delete_photo(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Value>> {
    let store = state.store.clone();
    let recipe = ensure_recipe_suffix(&path);
    let shown = recipe.clone();
    blocking(move || store.delete_photo(&recipe)).await?;
    Ok(Json(json!({"status": "ok", "recipe_path": shown})))
}
