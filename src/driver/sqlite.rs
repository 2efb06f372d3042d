//! SQLite driver built on `rusqlite`.
//!
//! URIs use the `file` protocol: `file://scores.sqlite`,
//! `file:///var/db/scores.sqlite`. Executing a statement steps it once; the
//! rowset keeps the running query and steps it one batch at a time.

use crate::core::db::{Cell, Database};
use crate::core::value::{NativeMatch, Storage, TypeRule, ValueType};
use crate::core::{CalendarDate, DatabaseError, ErrorKind, Result, Source};
use crate::driver::{ConnectionHandle, DatabaseHandle, Driver, RowsetHandle, StatementHandle};
use ouroboros::self_referencing;
use rusqlite::types::Value as SqlValue;
use rusqlite::{CachedStatement, Connection, OpenFlags, Rows};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// The SQLite backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Driver for Sqlite {
    const NAME: &'static str = "sqlite";

    type Database = SqliteDatabase;
    type Connection = SqliteConnection;
    type Statement = SqliteStatement;
    type Rowset = SqliteRowset;
}

/// Front-layer database over SQLite.
pub type SqliteDb = Database<Sqlite>;

/// Creates a database with no default URI; connect with `connection_to`.
pub fn create_database() -> Result<SqliteDb> {
    Database::new()
}

/// Converts a rusqlite failure into the uniform error, keeping the extended
/// result code and SQLite's own message.
fn sqlite_error(kind: ErrorKind, call: &str, e: rusqlite::Error) -> DatabaseError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) => DatabaseError::new(kind, call)
            .with_retcode(err.extended_code)
            .with_driver_message(msg.unwrap_or_else(|| err.to_string())),
        other => DatabaseError::new(kind, call).with_driver_message(other.to_string()),
    }
}

#[derive(Debug)]
pub struct SqliteDatabase;

impl DatabaseHandle for SqliteDatabase {
    fn new() -> Result<Self> {
        trace!("sqlite version: {}", rusqlite::version());
        Ok(SqliteDatabase)
    }

    fn date_column_type(&self) -> &'static str {
        "text"
    }
}

#[derive(Debug)]
pub struct SqliteConnection {
    conn: Rc<Connection>,
    path: String,
}

impl SqliteConnection {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ConnectionHandle for SqliteConnection {
    type Database = SqliteDatabase;

    fn open(_database: &SqliteDatabase, source: &Source) -> Result<Self> {
        match source.protocol.as_str() {
            "file" => {}
            "sqlite" => return Err(DatabaseError::config("uri protocol: use file instead of sqlite")),
            _ => return Err(DatabaseError::config("uri protocol must be file")),
        }

        let path = source.path();
        debug!("con: sqlite opening file: {}", path);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&path, flags)
            .map_err(|e| sqlite_error(ErrorKind::Connection, "sqlite3_open_v2", e))?;

        Ok(SqliteConnection {
            conn: Rc::new(conn),
            path,
        })
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        trace!("~con: sqlite closing {}", self.path);
    }
}

/// Column metadata captured at prepare time.
#[derive(Debug, Clone)]
struct ColumnInfo {
    name: String,
    decl_type: Option<String>,
}

/// A running query: the connection, its prepared statement and the open
/// result cursor, kept together so the cursor can outlive the call that
/// started it.
#[self_referencing]
struct LiveQuery {
    conn: Rc<Connection>,
    #[borrows(conn)]
    #[not_covariant]
    stmt: CachedStatement<'this>,
    #[borrows(mut stmt)]
    #[not_covariant]
    rows: Rows<'this>,
}

impl LiveQuery {
    fn start(conn: &Rc<Connection>, sql: &str) -> rusqlite::Result<Self> {
        LiveQuery::try_new(
            Rc::clone(conn),
            |conn| conn.prepare_cached(sql),
            |stmt| Ok(stmt.raw_query()),
        )
    }

    /// Steps once, copying out the row if there is one.
    fn step(&mut self, width: usize) -> rusqlite::Result<Option<Vec<SqlValue>>> {
        self.with_rows_mut(|rows| match rows.next()? {
            Some(row) => (0..width)
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(Some),
            None => Ok(None),
        })
    }
}

impl fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct SqliteStatement {
    conn: Rc<Connection>,
    sql: String,
    prepared: bool,
    executed: bool,
    /// Set once a rowset has taken this execution's results.
    handed_off: bool,
    columns: Vec<ColumnInfo>,
    binds: usize,
    live: Option<LiveQuery>,
    first: Option<Vec<SqlValue>>,
}

impl SqliteStatement {
    pub fn is_executed(&self) -> bool {
        self.executed
    }
}

impl StatementHandle for SqliteStatement {
    type Connection = SqliteConnection;

    fn new(connection: &SqliteConnection, sql: &str) -> Result<Self> {
        trace!("stmt: {}", sql);
        Ok(SqliteStatement {
            conn: Rc::clone(&connection.conn),
            sql: sql.to_string(),
            prepared: false,
            executed: false,
            handed_off: false,
            columns: Vec::new(),
            binds: 0,
            live: None,
            first: None,
        })
    }

    fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        trace!("prepare sql: {}", self.sql);
        let stmt = self
            .conn
            .prepare_cached(&self.sql)
            .map_err(|e| sqlite_error(ErrorKind::Statement, "sqlite3_prepare_v2", e))?;
        self.columns = stmt
            .columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                decl_type: c.decl_type().map(str::to_string),
            })
            .collect();
        self.binds = stmt.parameter_count();
        self.prepared = true;
        Ok(())
    }

    /// Steps the statement once. A no-op while the results of the last
    /// execution are still waiting for a rowset.
    fn execute(&mut self) -> Result<()> {
        if self.executed && !self.handed_off {
            return Ok(());
        }
        self.prepare()?;
        let mut live = LiveQuery::start(&self.conn, &self.sql)
            .map_err(|e| sqlite_error(ErrorKind::Statement, "sqlite3_prepare_v2", e))?;
        let first = live
            .step(self.columns.len())
            .map_err(|e| sqlite_error(ErrorKind::Statement, "sqlite3_step", e))?;
        trace!("sqlite3_step: has rows: {}", first.is_some());

        // A finished query is dropped here, which resets it.
        self.live = first.as_ref().map(|_| live);
        self.first = first;
        self.executed = true;
        self.handed_off = false;
        Ok(())
    }

    fn binds(&self) -> usize {
        self.binds
    }

    fn reset(&mut self) -> Result<()> {
        trace!("sqlite3_reset: {}", self.sql);
        self.executed = false;
        self.handed_off = false;
        self.live = None;
        self.first = None;
        Ok(())
    }
}

/// Affinity of a declared column type, with date declarations split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Date,
    /// Expression columns have no declared type
    Untyped,
}

impl SqliteType {
    /// Applies SQLite's affinity rules to a declared type name.
    pub fn from_decl(decl: Option<&str>) -> SqliteType {
        let decl = match decl {
            Some(d) if !d.trim().is_empty() => d.to_ascii_uppercase(),
            _ => return SqliteType::Untyped,
        };
        if decl.contains("INT") {
            SqliteType::Integer
        } else if decl.contains("DATE") || decl.contains("TIME") {
            SqliteType::Date
        } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
            SqliteType::Text
        } else if decl.contains("BLOB") {
            SqliteType::Blob
        } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
            SqliteType::Real
        } else {
            SqliteType::Numeric
        }
    }
}

const SQLITE_TYPES: &[TypeRule<SqliteType>] = &[
    TypeRule {
        native: NativeMatch::Exact(SqliteType::Integer),
        value_type: ValueType::Int,
        storage: Storage::Fixed(8),
    },
    TypeRule {
        native: NativeMatch::Exact(SqliteType::Date),
        value_type: ValueType::Date,
        storage: Storage::Variable,
    },
    TypeRule {
        native: NativeMatch::Exact(SqliteType::Text),
        value_type: ValueType::String,
        storage: Storage::Variable,
    },
    TypeRule::string_fallback(),
];

/// Holds at most one batch of copied rows; the rest stay in SQLite until
/// the next refill steps over them.
#[derive(Debug)]
pub struct SqliteRowset {
    columns: Vec<ColumnInfo>,
    batch_size: usize,
    live: Option<LiveQuery>,
    first: Option<Vec<SqlValue>>,
    batch: Vec<Vec<SqlValue>>,
    /// A step failure behind rows that were still delivered.
    failed: Option<DatabaseError>,
}

impl SqliteRowset {
    fn fill_batch(&mut self) -> Result<usize> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        self.batch.clear();
        self.batch.extend(self.first.take());
        while self.batch.len() < self.batch_size {
            let Some(live) = self.live.as_mut() else {
                break;
            };
            match live.step(self.columns.len()) {
                Ok(Some(values)) => self.batch.push(values),
                Ok(None) => self.live = None,
                Err(e) => {
                    self.live = None;
                    let err = sqlite_error(ErrorKind::Fetch, "sqlite3_step", e);
                    if self.batch.is_empty() {
                        return Err(err);
                    }
                    self.failed = Some(err);
                }
            }
        }
        trace!("sqlite batch: {} rows, done: {}", self.batch.len(), self.live.is_none());
        Ok(self.batch.len())
    }

    fn value(&self, cell: &Cell) -> Result<&SqlValue> {
        self.batch
            .get(cell.row_index())
            .and_then(|row| row.get(cell.bind().column))
            .ok_or_else(|| DatabaseError::fetch("no current row"))
    }
}

impl RowsetHandle for SqliteRowset {
    type Statement = SqliteStatement;
    type NativeType = SqliteType;

    fn open(statement: &mut SqliteStatement, batch_size: usize) -> Result<Self> {
        if !statement.executed || statement.handed_off {
            return Err(DatabaseError::usage("statement has no pending results"));
        }
        statement.handed_off = true;
        trace!("rowset, columns: {}", statement.columns.len());
        Ok(SqliteRowset {
            columns: statement.columns.clone(),
            batch_size,
            live: statement.live.take(),
            first: statement.first.take(),
            batch: Vec::new(),
            failed: None,
        })
    }

    fn columns(&self) -> usize {
        self.columns.len()
    }

    fn name(&self, column: usize) -> Result<String> {
        self.columns
            .get(column)
            .map(|c| c.name.clone())
            .ok_or_else(|| DatabaseError::usage(format!("column index out of range: {}", column)))
    }

    fn native_type(&self, column: usize) -> SqliteType {
        SqliteType::from_decl(self.columns.get(column).and_then(|c| c.decl_type.as_deref()))
    }

    fn type_map() -> &'static [TypeRule<SqliteType>] {
        SQLITE_TYPES
    }

    fn fetch(&mut self) -> Result<usize> {
        self.fill_batch()
    }

    fn next(&mut self) -> Result<usize> {
        self.fill_batch()
    }

    fn is_null(&self, cell: &Cell) -> bool {
        matches!(self.value(cell), Ok(SqlValue::Null))
    }

    fn get_int(&self, cell: &Cell) -> Result<i64> {
        match self.value(cell)? {
            SqlValue::Null => Ok(0),
            SqlValue::Integer(i) => Ok(*i),
            SqlValue::Real(f) => Ok(*f as i64),
            SqlValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| DatabaseError::type_error("type mismatch: text is not an integer")),
            SqlValue::Blob(_) => Err(DatabaseError::type_error("type mismatch: blob is not an integer")),
        }
    }

    fn get_string(&self, cell: &Cell) -> Result<String> {
        Ok(match self.value(cell)? {
            SqlValue::Null => String::new(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        })
    }

    fn get_date(&self, cell: &Cell) -> Result<CalendarDate> {
        match self.value(cell)? {
            SqlValue::Text(s) => s.parse(),
            _ => Err(DatabaseError::type_error("type mismatch")),
        }
    }
}
