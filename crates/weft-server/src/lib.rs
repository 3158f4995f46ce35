//! HTTP server for Weft.
//!
//! This crate wires the Weft building blocks into an axum server:
//! - Template pages: `GET /` renders `index.html`, `GET /{name}` renders
//!   template `name`
//! - Static files: `GET {url_prefix}/{*path}` served with cached `ETag`s
//! - Live reload: written template files are re-parsed while serving
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use weft_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         templates_dir: PathBuf::from("templates"),
//!         static_dir: PathBuf::from("static"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```

mod app;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use weft_files::{DirFs, FileStore};
use weft_templates::TemplateStore;

pub use error::ServerError;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory holding template files.
    pub templates_dir: PathBuf,
    /// Directory holding static files.
    pub static_dir: PathBuf,
    /// URL prefix for static files (e.g. `/static`).
    pub static_prefix: String,
    /// Reload written template files while serving.
    pub live_reload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            static_prefix: "/static".to_owned(),
            live_reload: true,
        }
    }
}

/// Create server configuration from Weft config.
#[must_use]
pub fn server_config_from_config(config: &weft_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        templates_dir: config.templates_resolved.dir.clone(),
        static_dir: config.static_resolved.dir.clone(),
        static_prefix: config.static_resolved.url_prefix.clone(),
        live_reload: config.templates_resolved.live_reload,
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the templates fail to compile or the server fails
/// to start. A failed template watch is logged and serving continues
/// without reload.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let templates = Arc::new(TemplateStore::open(&config.templates_dir)?);

    let watcher = if config.live_reload {
        match templates.watch() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Template live reload disabled");
                None
            }
        }
    } else {
        None
    };

    let state = Arc::new(AppState {
        templates,
        files: Arc::new(FileStore::new(DirFs::new(&config.static_dir))),
    });
    let app = app::create_router(state, &config.static_prefix);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(watcher) = watcher {
        watcher.stop();
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
