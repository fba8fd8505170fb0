//! Settings for applications embedding the quarry engine.
//!
//! [`Settings`] holds the runtime configuration an application needs to wire
//! up logging and a database backend. The engine itself only consumes
//! `debug`/`log_level` (through [`crate::logging::setup_logging`]); the
//! `[database]` section is handed to whatever executor implementation the
//! application uses.

use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Database connection configuration, consumed by executor implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub database: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Seconds an idle connection may sit in the pool before being closed.
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            max_connections: 10,
            idle_timeout_secs: 10,
        }
    }
}

/// The complete set of application settings.
///
/// Every key has a sensible default, so a partial TOML document (or none at
/// all) is valid.
///
/// # Examples
///
/// ```
/// use quarry_core::settings::Settings;
///
/// let settings = Settings::from_toml_str(
///     r#"
///     log_level = "debug"
///
///     [database]
///     database = "orders"
///     user = "app"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(settings.database.database, "orders");
/// assert_eq!(settings.database.port, 5432);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled (controls the log output format).
    pub debug: bool,
    /// The tracing filter directive (e.g. "info", "quarry_db=debug").
    pub log_level: String,
    /// Database connection configuration.
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Reads and parses settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// The global settings instance.
static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Installs the global settings. Returns `Err` with the rejected value if
/// settings were already installed.
pub fn init_settings(settings: Settings) -> Result<(), Settings> {
    SETTINGS.set(settings)
}

/// Returns the global settings, falling back to defaults if none were
/// installed.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::default)
}
