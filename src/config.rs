use crate::core::{init_logging_with, DatabaseError, LogHandle, LogLevel, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: Option<LogConfig>,
}

/// Database-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Default connection URI, e.g. `file://scores.sqlite`
    pub uri: String,
    /// Rows per fetch; 32 when absent
    pub batch_size: Option<usize>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: Option<String>,
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| DatabaseError::config(format!("invalid config: {}", e)))
    }

    /// The configured log level, if any.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown level name.
    pub fn log_level(&self) -> Result<Option<LogLevel>> {
        match self.log.as_ref().and_then(|l| l.level.as_deref()) {
            Some(name) => name.parse().map(Some),
            None => Ok(None),
        }
    }

    /// Installs the logger at the `[log] level`, or applies that level to
    /// the logger already installed.
    pub fn init_logging(&self) -> Result<&'static LogHandle> {
        init_logging_with(self.log_level()?)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// use stddb::config::load_config;
///
/// let config = load_config("stddb.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| DatabaseError::config(format!("cannot read {}: {}", path.display(), e)))?;
    Config::from_toml(&content)
}
