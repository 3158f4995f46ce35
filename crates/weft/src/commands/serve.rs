//! `weft serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use weft_config::{CliSettings, Config};
use weft_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover weft.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Template directory (overrides config).
    #[arg(short, long)]
    templates_dir: Option<PathBuf>,

    /// Static file directory (overrides config).
    #[arg(short, long)]
    static_dir: Option<PathBuf>,

    /// Enable verbose output (info-level logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable template live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable template live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let live_reload = self.resolve_live_reload();
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            templates_dir: self.templates_dir,
            static_dir: self.static_dir,
            live_reload,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::info!(path = ?config.config_path, "Loaded configuration");

        let address = format!("http://{}:{}", config.server.host, config.server.port);
        output.setting("Address", &address);
        output.setting("Templates", config.templates_resolved.dir.display());
        if config.static_resolved.dir.is_dir() {
            output.setting(
                "Static files",
                format!(
                    "{} at {}",
                    config.static_resolved.dir.display(),
                    config.static_resolved.url_prefix
                ),
            );
        } else {
            output.warning(&format!(
                "Static directory not found: {}",
                config.static_resolved.dir.display()
            ));
        }
        let live_reload = if config.templates_resolved.live_reload {
            "enabled"
        } else {
            "disabled"
        };
        output.setting("Live reload", live_reload);

        run_server(server_config_from_config(&config)).await?;
        output.success(&format!("Stopped serving {address}"));

        Ok(())
    }

    /// Resolve live reload from --live-reload/--no-live-reload flags.
    fn resolve_live_reload(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}
