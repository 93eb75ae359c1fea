//! Service configuration
//!
//! Defaults, then an optional `htcollector.toml`, then `HTCOLLECTOR_*`
//! environment variables. `LOGLEVEL` overrides the log level.

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::Level;

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// SQLite database file
    pub database_path: String,
    /// Pool size for the database
    pub max_connections: u32,
    /// Whether requests must carry a station id
    pub multi_station: bool,
    /// Reject implausible temperature and humidity values
    pub strict_validation: bool,
    /// `debug`, `error`, anything else means info
    pub log_level: String,
}

impl Settings {
    /// Builder preloaded with defaults
    pub fn builder() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("listen_addr", "0.0.0.0:8080")?
            .set_default("database_path", "readings.db")?
            .set_default("max_connections", 5_i64)?
            .set_default("multi_station", true)?
            .set_default("strict_validation", false)?
            .set_default("log_level", "info")
    }

    /// Load settings from all sources. Read once at startup.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("htcollector").required(false))
            .add_source(Environment::with_prefix("HTCOLLECTOR").try_parsing(true))
            .set_override_option("log_level", std::env::var("LOGLEVEL").ok())?
            .build()?
            .try_deserialize()
    }

    /// Tracing level for `log_level`
    pub fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "debug" => Level::DEBUG,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            database_path: "readings.db".to_string(),
            max_connections: 5,
            multi_station: true,
            strict_validation: false,
            log_level: "info".to_string(),
        }
    }
}
