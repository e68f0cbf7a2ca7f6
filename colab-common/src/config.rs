//! Bootstrap configuration loading and root folder resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: database path, bind address, port, logging
//! 2. **Command line / environment**: override any TOML value
//!
//! A missing TOML file is not fatal; built-in defaults are used and a warning
//! is logged. A malformed file is a configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "COLAB_ROOT_FOLDER";

/// Upper bound for `session_ttl_hours` (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "colab.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit SQLite database path (optional, defaults to `<root>/colab.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a login session
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Broadcast channel capacity for WebSocket fan-out
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            session_ttl_hours: default_session_ttl_hours(),
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_event_bus_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML bootstrap configuration
///
/// Missing file yields defaults (with a warning); unreadable or invalid TOML
/// is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Default configuration file path for the platform (`<config_dir>/colab/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("colab").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("colab.toml"))
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument
/// 2. `COLAB_ROOT_FOLDER` environment variable
/// 3. `root_folder` in the TOML config
/// 4. OS-dependent default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, toml: Option<&'a TomlConfig>) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml.and_then(|t| t.root_folder.as_ref()) {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("colab"))
        .unwrap_or_else(|| PathBuf::from("./colab_data"))
}

/// Command-line overrides, all optional
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Effective server configuration after merging all sources
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub event_bus_capacity: usize,
    pub log_level: String,
}

impl ServerConfig {
    /// Merge CLI > env > TOML > defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let root_folder =
            RootFolderResolver::new(cli.root_folder.as_deref(), Some(toml)).resolve();

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| toml.database_path.clone())
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME));

        if toml.session_ttl_hours <= 0 || toml.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(Error::Config(format!(
                "session_ttl_hours must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS, toml.session_ttl_hours
            )));
        }
        if toml.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be non-zero".to_string()));
        }

        Ok(Self {
            root_folder,
            database_path,
            bind_address: cli
                .bind_address
                .clone()
                .unwrap_or_else(|| toml.bind_address.clone()),
            port: cli.port.unwrap_or(toml.port),
            session_ttl_hours: toml.session_ttl_hours,
            event_bus_capacity: toml.event_bus_capacity,
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_defaults_fill_missing_fields() {
        let config: TomlConfig = toml::from_str("port = 9000").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.session_ttl_hours, 168);
        assert_eq!(config.logging.level, "info");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_logging_section_parsed() {
        let config: TomlConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig {
            database_path: Some(PathBuf::from("/tmp/from-toml.db")),
            port: 7000,
            ..TomlConfig::default()
        };
        let cli = CliOverrides {
            root_folder: Some(PathBuf::from("/tmp/colab-root")),
            port: Some(8123),
            ..CliOverrides::default()
        };

        let config = ServerConfig::resolve(&cli, &toml).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.database_path, PathBuf::from("/tmp/from-toml.db"));
        assert_eq!(config.root_folder, PathBuf::from("/tmp/colab-root"));
    }

    #[test]
    fn test_database_defaults_under_root_folder() {
        let cli = CliOverrides {
            root_folder: Some(PathBuf::from("/srv/colab")),
            ..CliOverrides::default()
        };
        let config = ServerConfig::resolve(&cli, &TomlConfig::default()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/colab/colab.db"));
    }

    #[test]
    fn test_non_positive_session_ttl_rejected() {
        let toml = TomlConfig {
            session_ttl_hours: 0,
            ..TomlConfig::default()
        };
        assert!(ServerConfig::resolve(&CliOverrides::default(), &toml).is_err());
    }

    #[test]
    fn test_oversized_session_ttl_rejected() {
        let toml = TomlConfig {
            session_ttl_hours: 3_000_000_000,
            ..TomlConfig::default()
        };
        assert!(ServerConfig::resolve(&CliOverrides::default(), &toml).is_err());

        let toml = TomlConfig {
            session_ttl_hours: MAX_SESSION_TTL_HOURS,
            ..TomlConfig::default()
        };
        assert!(ServerConfig::resolve(&CliOverrides::default(), &toml).is_ok());
    }
}
