//! Configuration loading and database path resolution
//!
//! Settings come from four sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! A missing default config file is not an error; a config file named
//! explicitly on the command line must exist and parse.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming the SQLite database file
pub const DATABASE_PATH_ENV: &str = "RUNCLUB_DATABASE_PATH";
/// Older deployments set this instead
pub const LEGACY_DATABASE_PATH_ENV: &str = "DATABASE_PATH";
/// Environment variable naming the HTTP port
pub const PORT_ENV: &str = "RUNCLUB_PORT";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_READ_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[database]` table of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    /// SQLite busy timeout before a lock-contention error surfaces
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,

    /// Size of the read-only connection pool
    #[serde(default)]
    pub max_read_connections: Option<u32>,
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything [`crate::Database::open`] needs
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub busy_timeout: Duration,
    pub max_read_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseSettings {
    /// Settings for a database file with built-in defaults for everything else
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            max_read_connections: DEFAULT_MAX_READ_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database: DatabaseSettings,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServiceConfig {
    /// Load the TOML file (explicit or default location) and resolve
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = load_toml_config(overrides.config_file.as_deref())?;
        Self::resolve(overrides, toml_config.unwrap_or_default())
    }

    /// Merge command-line overrides, environment and TOML values
    pub fn resolve(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let path = resolve_database_path(
            overrides.database_path.as_deref(),
            toml_config.database_path.as_deref(),
        );

        let port = match overrides.port {
            Some(port) => port,
            None => match env_value(PORT_ENV) {
                Some(raw) => raw.parse::<u16>().map_err(|e| {
                    Error::Config(format!("{} must be a port number, got '{}': {}", PORT_ENV, raw, e))
                })?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let host = overrides
            .host
            .clone()
            .or(toml_config.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let max_read_connections = toml_config
            .database
            .max_read_connections
            .unwrap_or(DEFAULT_MAX_READ_CONNECTIONS);
        if max_read_connections == 0 {
            return Err(Error::Config(
                "database.max_read_connections must be at least 1".to_string(),
            ));
        }

        let mut database = DatabaseSettings::new(path);
        database.max_read_connections = max_read_connections;
        if let Some(ms) = toml_config.database.busy_timeout_ms {
            database.busy_timeout = Duration::from_millis(ms);
        }

        Ok(Self {
            database,
            host,
            port,
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or(toml_config.logging.level),
        })
    }
}

/// Database path resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `RUNCLUB_DATABASE_PATH`, then `DATABASE_PATH`
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    for var in [DATABASE_PATH_ENV, LEGACY_DATABASE_PATH_ENV] {
        if let Some(path) = env_value(var) {
            debug!("Database path from {}", var);
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_database_path()
}

/// `/data/runclub.db` when a `/data` volume is mounted, else the working directory
pub fn default_database_path() -> PathBuf {
    let data_dir = Path::new("/data");
    if data_dir.is_dir() {
        data_dir.join("runclub.db")
    } else {
        PathBuf::from("runclub.db")
    }
}

/// Read the TOML config file
///
/// With an explicit path the file must exist. Without one, the default
/// locations are tried and `Ok(None)` is returned when none exists.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_file() {
            Some(path) => path,
            None => {
                debug!("No config file found, using defaults");
                return Ok(None);
            }
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let config = toml::from_str::<TomlConfig>(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Try ~/.config/runclub/config.toml first, then /etc/runclub/config.toml
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("runclub").join("config.toml"));
    let system_config = PathBuf::from("/etc/runclub/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}

/// Environment variable value, treating an empty string as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
