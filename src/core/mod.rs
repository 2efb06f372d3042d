//! Core Module for stddb
//!
//! This module contains the backend-independent pieces of the access layer:
//! error handling, logging, the date parser, connection descriptors, the
//! value-type tag set and the generic database front layer.

pub mod date;
pub mod db;
pub mod error;
pub mod log;
pub mod source;
pub mod value;

// Re-export commonly used types for convenience
pub use date::{parse_date, parse_datetime, CalendarDate, DateTime};
pub use error::{vertical_print, DatabaseError, ErrorKind, Result};
pub use log::{init_logging, init_logging_with, LogHandle, LogLevel};
pub use source::{build_uri, Source};
pub use value::{Bind, Describe, NativeMatch, Storage, TypeRule, Value, ValueType};
