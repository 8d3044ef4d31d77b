//! Handlers for `/api/search` (contents) and `/api/search/files` (names).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{blocking, AppState};
use crate::error::AppResult;
use crate::store::search::DEFAULT_LIMIT;
use crate::store::{ContentMatch, FileMatch, SearchOutcome};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn search_content(State(state): State<AppState>, Query(p): Query<SearchParams>) -> AppResult<Json<SearchOutcome<ContentMatch>>> {
    let store = state.store.clone();
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);
    let out = blocking(move || Ok(store.search_content(&p.q, limit))).await?;
    Ok(Json(out))
}

pub async fn search_files(State(state): State<AppState>, Query(p): Query<SearchParams>) -> AppResult<Json<SearchOutcome<FileMatch>>> {
    let store = state.store.clone();
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);
    let out = blocking(move || Ok(store.search_files(&p.q, limit))).await?;
    Ok(Json(out))
}
