//! Small helpers for test fixtures and setup scripts.

use crate::core::db::Database;
use crate::driver::Driver;
use tracing::warn;

pub use crate::core::source::build_uri;

/// Drops `table`, ignoring any failure such as the table not existing.
pub fn drop_table<D: Driver>(db: &Database<D>, table: &str) {
    if let Err(e) = db.query(&format!("drop table {}", table)) {
        warn!("drop table error (ignored): {}", e);
    }
}
