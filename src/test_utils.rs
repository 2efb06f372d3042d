//! # Test Utilities Module
//!
//! A scripted in-memory driver for exercising the front layer without a real
//! backend.
//!
//! Tests register the result a statement should produce with [`script`]; the
//! driver then serves those rows in exactly `batch_size` chunks and counts
//! every prepare, execute, fetch and reset per SQL text. State is
//! thread-local, so each test (running on its own thread) starts clean.
//!
//! URIs use the `mem` protocol. The server `unreachable` refuses connections.

use crate::core::db::Cell;
use crate::core::value::{NativeMatch, Storage, TypeRule, ValueType};
use crate::core::{DatabaseError, ErrorKind, Result, Source};
use crate::driver::{ConnectionHandle, DatabaseHandle, Driver, RowsetHandle, StatementHandle};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, Default)]
pub struct MemDriver;

impl Driver for MemDriver {
    const NAME: &'static str = "mem";

    type Database = MemDatabase;
    type Connection = MemConnection;
    type Statement = MemStatement;
    type Rowset = MemRowset;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemType {
    Int,
    Text,
    Date,
    Blob,
    /// Bound as a variant, which the front layer cannot render
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemValue {
    Null,
    Int(i64),
    Text(String),
}

impl From<&str> for MemValue {
    fn from(s: &str) -> Self {
        MemValue::Text(s.to_string())
    }
}

impl From<String> for MemValue {
    fn from(s: String) -> Self {
        MemValue::Text(s)
    }
}

/// What executing one SQL text produces.
#[derive(Debug, Clone, Default)]
pub struct MemResult {
    columns: Vec<(String, MemType)>,
    rows: Vec<Vec<MemValue>>,
    fail_after: Option<usize>,
}

impl MemResult {
    /// A statement without a result set.
    pub fn command() -> Self {
        MemResult::default()
    }

    pub fn rows(columns: &[(&str, MemType)], rows: Vec<Vec<MemValue>>) -> Self {
        MemResult {
            columns: columns.iter().map(|(n, t)| (n.to_string(), *t)).collect(),
            rows,
            fail_after: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    prepares: usize,
    executions: usize,
    fetches: usize,
    resets: usize,
}

thread_local! {
    static SCRIPTS: RefCell<HashMap<String, MemResult>> = RefCell::new(HashMap::new());
    static COUNTERS: RefCell<HashMap<String, Counters>> = RefCell::new(HashMap::new());
}

/// Registers the result `sql` produces on this thread.
pub fn script(sql: &str, result: MemResult) {
    SCRIPTS.with(|s| s.borrow_mut().insert(sql.to_string(), result));
}

/// Makes fetches of `sql` fail once `rows` rows have been delivered.
pub fn fail_fetch_after(sql: &str, rows: usize) {
    SCRIPTS.with(|s| {
        if let Some(result) = s.borrow_mut().get_mut(sql) {
            result.fail_after = Some(rows);
        }
    });
}

fn scripted(sql: &str) -> Option<MemResult> {
    SCRIPTS.with(|s| s.borrow().get(sql).cloned())
}

fn count(sql: &str, bump: impl FnOnce(&mut Counters)) {
    COUNTERS.with(|c| bump(c.borrow_mut().entry(sql.to_string()).or_default()));
}

fn counters(sql: &str) -> Counters {
    COUNTERS.with(|c| c.borrow().get(sql).copied().unwrap_or_default())
}

pub fn prepares(sql: &str) -> usize {
    counters(sql).prepares
}

pub fn executions(sql: &str) -> usize {
    counters(sql).executions
}

/// First fetches plus batch refills, including the one that came back empty.
pub fn fetches(sql: &str) -> usize {
    counters(sql).fetches
}

pub fn resets(sql: &str) -> usize {
    counters(sql).resets
}

#[derive(Debug)]
pub struct MemDatabase;

impl DatabaseHandle for MemDatabase {
    fn new() -> Result<Self> {
        Ok(MemDatabase)
    }

    fn date_column_type(&self) -> &'static str {
        "date"
    }
}

#[derive(Debug)]
pub struct MemConnection {
    pub source: Source,
}

impl ConnectionHandle for MemConnection {
    type Database = MemDatabase;

    fn open(_database: &MemDatabase, source: &Source) -> Result<Self> {
        if source.protocol != "mem" {
            return Err(DatabaseError::config("uri protocol must be mem"));
        }
        if source.server == "unreachable" {
            return Err(DatabaseError::connection("connect")
                .with_retcode(2002)
                .with_driver_message("host unreachable"));
        }
        Ok(MemConnection { source: source.clone() })
    }
}

#[derive(Debug)]
pub struct MemStatement {
    sql: String,
    columns: Vec<(String, MemType)>,
    result: Option<MemResult>,
}

impl StatementHandle for MemStatement {
    type Connection = MemConnection;

    fn new(_connection: &MemConnection, sql: &str) -> Result<Self> {
        Ok(MemStatement {
            sql: sql.to_string(),
            columns: Vec::new(),
            result: None,
        })
    }

    fn prepare(&mut self) -> Result<()> {
        count(&self.sql, |c| c.prepares += 1);
        let result = scripted(&self.sql).ok_or_else(|| {
            DatabaseError::new(ErrorKind::Statement, "prepare")
                .with_retcode(1)
                .with_driver_message(format!("syntax error near '{}'", self.sql))
        })?;
        self.columns = result.columns;
        Ok(())
    }

    /// Re-runs the script on every call.
    fn execute(&mut self) -> Result<()> {
        count(&self.sql, |c| c.executions += 1);
        self.result = scripted(&self.sql);
        Ok(())
    }

    fn binds(&self) -> usize {
        self.sql.matches('?').count()
    }

    fn reset(&mut self) -> Result<()> {
        count(&self.sql, |c| c.resets += 1);
        self.result = None;
        Ok(())
    }
}

const MEM_TYPES: &[TypeRule<MemType>] = &[
    TypeRule {
        native: NativeMatch::Exact(MemType::Int),
        value_type: ValueType::Int,
        storage: Storage::Fixed(8),
    },
    TypeRule {
        native: NativeMatch::Exact(MemType::Text),
        value_type: ValueType::String,
        storage: Storage::Variable,
    },
    TypeRule {
        native: NativeMatch::Exact(MemType::Date),
        value_type: ValueType::Date,
        storage: Storage::Variable,
    },
    TypeRule {
        native: NativeMatch::Exact(MemType::Json),
        value_type: ValueType::Variant,
        storage: Storage::Variable,
    },
    TypeRule::string_fallback(),
];

#[derive(Debug)]
pub struct MemRowset {
    sql: String,
    columns: Vec<(String, MemType)>,
    batch_size: usize,
    pending: VecDeque<Vec<MemValue>>,
    batch: Vec<Vec<MemValue>>,
    delivered: usize,
    fail_after: Option<usize>,
}

impl MemRowset {
    fn fill_batch(&mut self) -> Result<usize> {
        count(&self.sql, |c| c.fetches += 1);
        let mut n = self.batch_size.min(self.pending.len());
        if let Some(limit) = self.fail_after {
            if self.delivered >= limit && !self.pending.is_empty() {
                return Err(DatabaseError::fetch("fetch").with_driver_message("connection lost"));
            }
            n = n.min(limit - self.delivered);
        }
        self.batch = self.pending.drain(..n).collect();
        self.delivered += n;
        Ok(n)
    }

    fn value(&self, cell: &Cell) -> Result<&MemValue> {
        self.batch
            .get(cell.row_index())
            .and_then(|row| row.get(cell.column()))
            .ok_or_else(|| DatabaseError::fetch("no current row"))
    }
}

impl RowsetHandle for MemRowset {
    type Statement = MemStatement;
    type NativeType = MemType;

    fn open(statement: &mut MemStatement, batch_size: usize) -> Result<Self> {
        let result = statement
            .result
            .take()
            .ok_or_else(|| DatabaseError::usage("statement has no pending results"))?;
        Ok(MemRowset {
            sql: statement.sql.clone(),
            columns: statement.columns.clone(),
            batch_size,
            pending: result.rows.into(),
            batch: Vec::new(),
            delivered: 0,
            fail_after: result.fail_after,
        })
    }

    fn columns(&self) -> usize {
        self.columns.len()
    }

    fn name(&self, column: usize) -> Result<String> {
        self.columns
            .get(column)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| DatabaseError::usage(format!("column index out of range: {}", column)))
    }

    fn native_type(&self, column: usize) -> MemType {
        self.columns.get(column).map(|(_, t)| *t).unwrap_or(MemType::Blob)
    }

    fn type_map() -> &'static [TypeRule<MemType>] {
        MEM_TYPES
    }

    fn fetch(&mut self) -> Result<usize> {
        self.fill_batch()
    }

    fn next(&mut self) -> Result<usize> {
        self.fill_batch()
    }

    fn is_null(&self, cell: &Cell) -> bool {
        matches!(self.value(cell), Ok(MemValue::Null))
    }

    fn get_int(&self, cell: &Cell) -> Result<i64> {
        match self.value(cell)? {
            MemValue::Null => Ok(0),
            MemValue::Int(i) => Ok(*i),
            MemValue::Text(s) => s
                .parse()
                .map_err(|_| DatabaseError::type_error(format!("not an integer: {}", s))),
        }
    }

    fn get_string(&self, cell: &Cell) -> Result<String> {
        Ok(match self.value(cell)? {
            MemValue::Null => String::new(),
            MemValue::Int(i) => i.to_string(),
            MemValue::Text(s) => s.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_follow_batch_size() {
        script(
            "select x",
            MemResult::rows(
                &[("x", MemType::Int)],
                (0..5).map(|i| vec![MemValue::Int(i)]).collect(),
            ),
        );
        let con = MemConnection::open(&MemDatabase, &Source::parse("mem://local/db").unwrap()).unwrap();
        let mut stmt = MemStatement::new(&con, "select x").unwrap();
        stmt.prepare().unwrap();
        stmt.execute().unwrap();

        let mut rs = MemRowset::open(&mut stmt, 2).unwrap();
        assert_eq!(rs.fetch().unwrap(), 2);
        assert_eq!(rs.next().unwrap(), 2);
        assert_eq!(rs.next().unwrap(), 1);
        assert_eq!(rs.next().unwrap(), 0);
        assert_eq!(fetches("select x"), 4);
        assert!(MemRowset::open(&mut stmt, 2).unwrap_err().is_usage());
    }

    #[test]
    fn test_unscripted_sql_fails_to_prepare() {
        let con = MemConnection::open(&MemDatabase, &Source::parse("mem://local/db").unwrap()).unwrap();
        let mut stmt = MemStatement::new(&con, "select nothing").unwrap();
        let err = stmt.prepare().unwrap_err();
        assert!(err.is_statement());
        assert_eq!(err.retcode(), Some(1));
    }
}
