//! Driver contract.
//!
//! A backend plugs into the front layer by implementing one handle trait per
//! level (database, connection, statement, rowset) and bundling them in a
//! [`Driver`]. The front layer never sees backend-specific types beyond these
//! traits.
//!
//! Any backend call that reports failure must surface as a
//! [`DatabaseError`](crate::DatabaseError) carrying a message, and where the
//! backend provides them, its status code and native error text.

pub mod sqlite;

use crate::core::date::parse_date;
use crate::core::db::Cell;
use crate::core::value::TypeRule;
use crate::core::{CalendarDate, Result, Source};
use std::fmt;

/// A backend: the four handle types that make up its capability set.
pub trait Driver: Sized + 'static {
    /// Short backend name used in log lines.
    const NAME: &'static str;

    type Database: DatabaseHandle;
    type Connection: ConnectionHandle<Database = Self::Database>;
    type Statement: StatementHandle<Connection = Self::Connection>;
    type Rowset: RowsetHandle<Statement = Self::Statement>;
}

/// Native column type tag of a driver.
pub type NativeType<D> = <<D as Driver>::Rowset as RowsetHandle>::NativeType;

/// Process-level backend state, e.g. a client library handle.
pub trait DatabaseHandle: Sized {
    fn new() -> Result<Self>;

    /// Column type the dialect uses for calendar dates in DDL.
    fn date_column_type(&self) -> &'static str;
}

/// An open backend session.
pub trait ConnectionHandle: Sized {
    type Database;

    /// Establishes a session for `source`.
    ///
    /// # Errors
    ///
    /// Configuration errors for descriptors the backend cannot serve,
    /// connection errors (with the native text attached) otherwise.
    fn open(database: &Self::Database, source: &Source) -> Result<Self>;
}

/// A unit of SQL bound to one connection.
pub trait StatementHandle: Sized {
    type Connection;

    fn new(connection: &Self::Connection, sql: &str) -> Result<Self>;

    /// Must be idempotent.
    fn prepare(&mut self) -> Result<()>;

    /// Whether a second call re-runs the query is up to the driver.
    fn execute(&mut self) -> Result<()>;

    /// Number of bound parameters found by `prepare`.
    fn binds(&self) -> usize;

    /// Called by the rowset once a fetch reports no more data, leaving the
    /// statement executable again.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Cursor state over an executed statement's results.
pub trait RowsetHandle: Sized {
    type Statement;
    type NativeType: Clone + PartialEq + fmt::Debug + 'static;

    /// Opens a rowset over `statement` delivering up to `batch_size` rows per
    /// fetch. No rows are retrieved yet.
    ///
    /// Takes over the results of the last execution; a usage error if there
    /// are none left to take.
    fn open(statement: &mut Self::Statement, batch_size: usize) -> Result<Self>;

    /// Zero for statements that do not produce rows.
    fn columns(&self) -> usize;

    fn name(&self, column: usize) -> Result<String>;

    fn native_type(&self, column: usize) -> Self::NativeType;

    /// Ordered native → semantic rules; the first match wins.
    fn type_map() -> &'static [TypeRule<Self::NativeType>];

    /// First retrieval. Returns the number of rows in the batch, 0 for none.
    fn fetch(&mut self) -> Result<usize>;

    /// Next batch. Returns its row count, 0 once the results are exhausted.
    fn next(&mut self) -> Result<usize>;

    fn is_null(&self, _cell: &Cell) -> bool {
        false
    }

    fn get_int(&self, cell: &Cell) -> Result<i64>;

    fn get_string(&self, cell: &Cell) -> Result<String>;

    /// Defaults to parsing the column's text.
    fn get_date(&self, cell: &Cell) -> Result<CalendarDate> {
        parse_date(&self.get_string(cell)?)
    }
}
