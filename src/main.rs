use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use recipe_store::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let cfg = ServerConfig::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "recipe_store",
        "Recipe store starting: RUST_LOG='{}', bind={}, http_port={}, recipes_dir='{}'",
        rust_log, cfg.bind, cfg.http_port, cfg.recipes_dir.display()
    );

    recipe_store::server::run(cfg).await
}
