//! Server configuration read from the environment.
//!
//! - `RECIPES_DIR`        store root (default `recipes`, created on startup)
//! - `RECIPES_HTTP_PORT`  listen port (default 8000)
//! - `RECIPES_BIND`       listen address (default `0.0.0.0`)

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use path_absolutize::Absolutize;

pub const ENV_RECIPES_DIR: &str = "RECIPES_DIR";
pub const ENV_HTTP_PORT: &str = "RECIPES_HTTP_PORT";
pub const ENV_BIND: &str = "RECIPES_BIND";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub recipes_dir: PathBuf,
    pub bind: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            recipes_dir: PathBuf::from("recipes"),
            bind: "0.0.0.0".to_string(),
            http_port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank values keep defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut cfg = ServerConfig::default();
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(dir) = get(ENV_RECIPES_DIR) {
            cfg.recipes_dir = PathBuf::from(dir);
        }
        if let Some(bind) = get(ENV_BIND) {
            cfg.bind = bind;
        }
        if let Some(port) = get(ENV_HTTP_PORT) {
            cfg.http_port = port
                .parse::<u16>()
                .with_context(|| format!("{ENV_HTTP_PORT} must be a port number, got '{port}'"))?;
        }
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.http_port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.bind, self.http_port))
    }

    /// Absolute form of the store root, without resolving symlinks.
    pub fn recipes_dir_abs(&self) -> Result<PathBuf> {
        Ok(self.recipes_dir.absolutize()?.to_path_buf())
    }
}
