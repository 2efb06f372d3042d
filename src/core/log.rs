//! Leveled logging for stddb.
//!
//! Every component logs through `tracing`. [`init_logging`] installs a
//! process-wide subscriber whose minimum level comes from the
//! `STDDB_LOG_LEVEL` environment variable and can be changed later through
//! the returned [`LogHandle`]. [`init_logging_with`] also takes the level
//! from the `[log]` config section; the environment variable still wins.

use crate::core::{DatabaseError, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tracing_fmt, reload, Registry};

/// Environment variable naming the minimum log level.
pub const LOG_LEVEL_ENV: &str = "STDDB_LOG_LEVEL";

/// Minimum severity that gets written. `None` silences everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    None,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "NONE",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Reads the level from `STDDB_LOG_LEVEL`, `Ok(None)` when unset or blank.
    pub fn from_env() -> Result<Option<LogLevel>> {
        match std::env::var(LOG_LEVEL_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }
}

impl FromStr for LogLevel {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(LogLevel::None),
            "ERROR" => Ok(LogLevel::Error),
            "WARN" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(DatabaseError::config(format!("log level name not found: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the installed logger.
pub struct LogHandle {
    filter: reload::Handle<LevelFilter, Registry>,
    level: Mutex<LogLevel>,
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle").field("level", &self.level()).finish()
    }
}

impl LogHandle {
    pub fn level(&self) -> LogLevel {
        self.level.lock().map(|g| *g).unwrap_or_default()
    }

    /// Changes the minimum level. Concurrent callers are serialized.
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        let mut guard = self
            .level
            .lock()
            .map_err(|_| DatabaseError::config("log level lock poisoned"))?;
        info!("setting log level from {} to {}", *guard, level);
        self.filter
            .reload(level.to_filter())
            .map_err(|e| DatabaseError::config(format!("failed to reload log filter: {}", e)))?;
        *guard = level;
        Ok(())
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self.level()
    }
}

static LOGGER: OnceCell<LogHandle> = OnceCell::new();

/// `STDDB_LOG_LEVEL` over the configured level over the default.
fn pick_level(env: Option<LogLevel>, configured: Option<LogLevel>) -> LogLevel {
    env.or(configured).unwrap_or_default()
}

/// Installs the global subscriber on first call and returns its handle.
///
/// Later calls return the same handle without touching the subscriber.
///
/// # Errors
///
/// Returns a configuration error if `STDDB_LOG_LEVEL` names an unknown level
/// or another global subscriber is already installed.
pub fn init_logging() -> Result<&'static LogHandle> {
    init_logging_with(None)
}

/// Like [`init_logging`], falling back to `configured` when
/// `STDDB_LOG_LEVEL` is unset. If the logger is already installed, a
/// configured level is applied to it through [`LogHandle::set_level`].
pub fn init_logging_with(configured: Option<LogLevel>) -> Result<&'static LogHandle> {
    let level = pick_level(LogLevel::from_env()?, configured);
    let mut installed = false;
    let handle = LOGGER.get_or_try_init(|| {
        installed = true;
        let (filter, handle) = reload::Layer::new(level.to_filter());
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| DatabaseError::config(format!("failed to install logger: {}", e)))?;
        Ok::<_, DatabaseError>(LogHandle {
            filter: handle,
            level: Mutex::new(level),
        })
    })?;
    if !installed && configured.is_some() && handle.level() != level {
        handle.set_level(level)?;
    }
    Ok(handle)
}

/// Returns the installed handle, if [`init_logging`] has succeeded.
pub fn logger() -> Option<&'static LogHandle> {
    LOGGER.get()
}
