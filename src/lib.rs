//! stddb: one set of database abstractions over pluggable drivers.
//!
//! A [`Database`] hands out [`Connection`]s, which prepare [`Statement`]s,
//! whose results are walked with a forward-only [`Rowset`] cursor. Each
//! [`Row`] yields [`Field`]s that convert the driver's buffer on demand.

// Core infrastructure modules
pub mod core;
pub mod driver;

// Feature-specific modules
pub mod config;
pub mod sql_util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::config::{load_config, Config};
pub use crate::core::db::{
    Cell, Connection, Database, Field, FromField, Row, Rows, Rowset, Statement, StatementState,
    DEFAULT_BATCH_SIZE,
};
pub use crate::core::{
    init_logging, init_logging_with, parse_date, parse_datetime, CalendarDate, DatabaseError, ErrorKind, LogLevel, Result, Source,
    Value, ValueType,
};
pub use crate::driver::sqlite::{self, Sqlite};
pub use crate::driver::Driver;
