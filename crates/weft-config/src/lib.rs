//! Configuration management for Weft.
//!
//! Parses `weft.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `static.url_prefix`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override template directory.
    pub templates_dir: Option<PathBuf>,
    /// Override static file directory.
    pub static_dir: Option<PathBuf>,
    /// Override live reload enabled flag.
    pub live_reload: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "weft.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Template configuration (paths are relative strings from TOML).
    templates: TemplatesConfigRaw,
    /// Static file configuration (paths are relative strings from TOML).
    #[serde(rename = "static")]
    static_files: StaticConfigRaw,

    /// Resolved template configuration (set after loading).
    #[serde(skip)]
    pub templates_resolved: TemplatesConfig,
    /// Resolved static file configuration (set after loading).
    #[serde(skip)]
    pub static_resolved: StaticConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// Raw template configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TemplatesConfigRaw {
    dir: Option<String>,
    live_reload: Option<bool>,
}

/// Resolved template configuration with absolute paths.
#[derive(Debug)]
pub struct TemplatesConfig {
    /// Directory holding template files.
    pub dir: PathBuf,
    /// Whether written template files are reloaded while serving.
    pub live_reload: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates"),
            live_reload: true,
        }
    }
}

/// Raw static file configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StaticConfigRaw {
    dir: Option<String>,
    url_prefix: Option<String>,
}

/// Resolved static file configuration with absolute paths.
#[derive(Debug)]
pub struct StaticConfig {
    /// Directory holding static files.
    pub dir: PathBuf,
    /// URL path prefix static files are served under (e.g. `/static`).
    pub url_prefix: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static"),
            url_prefix: DEFAULT_URL_PREFIX.to_owned(),
        }
    }
}

const DEFAULT_URL_PREFIX: &str = "/static";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`WEFT_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `weft.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(dir) = &settings.templates_dir {
            self.templates_resolved.dir.clone_from(dir);
        }
        if let Some(dir) = &settings.static_dir {
            self.static_resolved.dir.clone_from(dir);
        }
        if let Some(live_reload) = settings.live_reload {
            self.templates_resolved.live_reload = live_reload;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            templates: TemplatesConfigRaw::default(),
            static_files: StaticConfigRaw::default(),
            templates_resolved: TemplatesConfig {
                dir: base.join("templates"),
                live_reload: true,
            },
            static_resolved: StaticConfig {
                dir: base.join("static"),
                url_prefix: DEFAULT_URL_PREFIX.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying
    /// CLI settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_static()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate static file configuration.
    fn validate_static(&self) -> Result<(), ConfigError> {
        let prefix = &self.static_resolved.url_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "static.url_prefix must start with / and name a path segment, got {prefix:?}"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref prefix) = self.static_files.url_prefix {
            self.static_files.url_prefix = Some(expand::expand_env(prefix, "static.url_prefix")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.templates_resolved = TemplatesConfig {
            dir: resolve(self.templates.dir.as_deref(), "templates"),
            live_reload: self.templates.live_reload.unwrap_or(true),
        };

        self.static_resolved = StaticConfig {
            dir: resolve(self.static_files.dir.as_deref(), "static"),
            url_prefix: self
                .static_files
                .url_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_URL_PREFIX.to_owned()),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/site"));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.templates_resolved.dir, PathBuf::from("/site/templates"));
        assert!(config.templates_resolved.live_reload);
        assert_eq!(config.static_resolved.dir, PathBuf::from("/site/static"));
        assert_eq!(config.static_resolved.url_prefix, "/static");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_server_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_resolves_paths_against_config_dir() {
        let (temp_dir, path) = write_config(
            r#"
[templates]
dir = "views"
live_reload = false

[static]
dir = "public"
url_prefix = "/assets"
"#,
        );

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.templates_resolved.dir, temp_dir.path().join("views"));
        assert!(!config.templates_resolved.live_reload);
        assert_eq!(config.static_resolved.dir, temp_dir.path().join("public"));
        assert_eq!(config.static_resolved.url_prefix, "/assets");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_uses_defaults_for_missing_sections() {
        let (temp_dir, path) = write_config("[server]\nport = 3000\n");

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.templates_resolved.dir,
            temp_dir.path().join("templates")
        );
        assert_eq!(config.static_resolved.dir, temp_dir.path().join("static"));
        assert!(config.templates_resolved.live_reload);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nope.toml");

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::NotFound(p)) if p == path));
    }

    #[test]
    fn test_load_invalid_toml() {
        let (_temp_dir, path) = write_config("[server\n");

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_cli_settings_override_file() {
        let (_temp_dir, path) = write_config("[server]\nport = 3000\n");
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(4000),
            templates_dir: Some(PathBuf::from("/other/templates")),
            static_dir: Some(PathBuf::from("/other/static")),
            live_reload: Some(false),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(
            config.templates_resolved.dir,
            PathBuf::from("/other/templates")
        );
        assert_eq!(config.static_resolved.dir, PathBuf::from("/other/static"));
        assert!(!config.templates_resolved.live_reload);
    }

    #[test]
    fn test_cli_port_zero_is_rejected() {
        let (_temp_dir, path) = write_config("");
        let settings = CliSettings {
            port: Some(0),
            ..CliSettings::default()
        };

        let result = Config::load(Some(&path), Some(&settings));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let (_temp_dir, path) = write_config("[server]\nhost = \"\"\n");

        let err = Config::load(Some(&path), None).unwrap_err();

        assert_eq!(err.to_string(), "Configuration error: server.host cannot be empty");
    }

    #[test]
    fn test_validate_rejects_bad_url_prefix() {
        for prefix in ["static", "/", "/static/"] {
            let (_temp_dir, path) = write_config(&format!("[static]\nurl_prefix = \"{prefix}\"\n"));

            let result = Config::load(Some(&path), None);

            assert!(
                matches!(result, Err(ConfigError::Validation(_))),
                "prefix {prefix:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_host_env_default_expansion() {
        let (_temp_dir, path) =
            write_config("[server]\nhost = \"${WEFT_TEST_HOST_SURELY_UNSET:-0.0.0.0}\"\n");

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_host_env_unset_is_error() {
        let (_temp_dir, path) = write_config("[server]\nhost = \"${WEFT_TEST_HOST_SURELY_UNSET}\"\n");

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::EnvVar { ref field, .. }) if field == "server.host"));
    }
}
