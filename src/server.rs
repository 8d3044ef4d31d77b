//!
//! recipe-store HTTP server
//! ------------------------
//! Axum router exposing the recipe store as a small REST API.
//!
//! Responsibilities:
//! - File CRUD and moves under `/api/files`, directories under `/api/directories`.
//! - Multipart text upload under `/api/upload`.
//! - Content and filename search under `/api/search`.
//! - Recipe conveniences (`/api/recipes`) and JPEG photo sidecars (`/api/photos`).
//! - Translating store errors to status codes via `AppError`.
//!
//! Every store call is blocking filesystem work and runs on the blocking pool,
//! so one slow disk operation never stalls unrelated requests.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, FromRequest, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::store::photos::MAX_PHOTO_BYTES;
use crate::store::{RecipeStore, StoreResult};

pub mod files;
pub mod photos;
pub mod search;

/// Shared server state injected into all handlers. The store handle is the
/// only thing shared; it carries no mutable state.
#[derive(Clone)]
pub struct AppState {
    pub store: RecipeStore,
}

/// `Json` whose rejections come back as an `AppError` body like every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Run a store operation on the blocking pool and map its error.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal("join_error".to_string(), e.to_string()))?
        .map_err(AppError::from)
}

pub fn router(state: AppState) -> Router {
    use axum::routing::{post, put};
    Router::new()
        .route("/health", get(health))
        .route("/api", get(api_root))
        .route("/api/files", get(files::list_files))
        .route(
            "/api/files/{*path}",
            get(files::read_file)
                .put(files::write_file)
                .post(files::create_or_move)
                .delete(files::delete_file),
        )
        .route("/api/upload", post(files::upload_file))
        .route("/api/directories", get(files::directory_tree))
        .route("/api/directories/{*path}", post(files::create_directory).delete(files::delete_directory))
        .route("/api/recipes/{*path}", put(files::save_recipe).post(files::create_recipe))
        .route("/api/search", get(search::search_content))
        .route("/api/search/files", get(search::search_files))
        .route(
            "/api/photos/{*path}",
            get(photos::get_photo)
                .put(photos::upload_photo)
                .post(photos::upload_photo)
                .delete(photos::delete_photo),
        )
        // Photos may be up to MAX_PHOTO_BYTES; leave headroom so the store reports 413 itself.
        .layer(DefaultBodyLimit::max((MAX_PHOTO_BYTES as usize) + 1024 * 1024))
        .with_state(state)
}

async fn api_root() -> Json<serde_json::Value> {
    Json(json!({"message": "Recipe Store API", "status": "running", "version": env!("CARGO_PKG_VERSION")}))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let root_ok = state.store.root().is_dir();
    Json(json!({
        "status": if root_ok { "healthy" } else { "degraded" },
        "recipes_dir": state.store.root().display().to_string(),
    }))
}

fn log_startup_folders(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    let abs = cfg.recipes_dir_abs().ok();
    let exists = cfg.recipes_dir.exists();
    info!(
        target: "startup",
        "recipe-store starting. cwd={:?}, recipes_dir_param={:?}, recipes_dir_abs={:?}, exists={}",
        cwd, cfg.recipes_dir, abs, exists
    );
}

/// Serve the API on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, store: RecipeStore) -> anyhow::Result<()> {
    let app = router(AppState { store });
    axum::serve(listener, app).await?;
    Ok(())
}

/// Open the store described by `cfg` and serve the API.
pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    log_startup_folders(&cfg);

    let store = RecipeStore::open(&cfg.recipes_dir)
        .with_context(|| format!("Failed to create or access recipes root: {}", cfg.recipes_dir.display()))?;
    info!(target: "startup", root = %store.root().display(), "store opened");

    let addr: SocketAddr = cfg.socket_addr()?;
    info!("Starting server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve(listener, store).await
}
