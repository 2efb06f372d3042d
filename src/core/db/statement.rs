//! Statement handle and its lifecycle.

use crate::core::db::{Connection, Database, Rowset};
use crate::core::{DatabaseError, Result};
use crate::driver::{Driver, StatementHandle};
use std::cell::{Cell, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Where a statement stands in `unprepared → prepared → executed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Unprepared,
    Prepared,
    Executed,
}

struct StatementInner<D: Driver> {
    connection: Connection<D>,
    sql: String,
    handle: RefCell<D::Statement>,
    state: Cell<StatementState>,
    /// A rowset has taken the results of the current execution.
    results_taken: Cell<bool>,
}

/// A unit of SQL bound to one connection.
///
/// A statement keeps its connection alive. Cloning shares the same driver
/// statement, which is how rowsets hold on to it.
pub struct Statement<D: Driver> {
    inner: Rc<StatementInner<D>>,
}

impl<D: Driver> Clone for Statement<D> {
    fn clone(&self) -> Self {
        Statement {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Driver> fmt::Debug for Statement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.inner.sql)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl<D: Driver> Statement<D> {
    /// Creates a statement for `sql` on `connection` and prepares it.
    ///
    /// # Errors
    ///
    /// Returns a statement error carrying the backend's diagnostics if the SQL
    /// does not prepare.
    pub fn new(connection: &Connection<D>, sql: &str) -> Result<Self> {
        let handle = D::Statement::new(connection.handle(), sql)?;
        let stmt = Statement {
            inner: Rc::new(StatementInner {
                connection: connection.clone(),
                sql: sql.to_string(),
                handle: RefCell::new(handle),
                state: Cell::new(StatementState::Unprepared),
                results_taken: Cell::new(false),
            }),
        };
        stmt.prepare()?;
        Ok(stmt)
    }

    /// Prepares the statement. Repeated calls are no-ops.
    pub fn prepare(&self) -> Result<&Self> {
        if self.state() != StatementState::Unprepared {
            return Ok(self);
        }
        debug!("prepare: {}", self.inner.sql);
        self.inner.handle.borrow_mut().prepare()?;
        self.inner.state.set(StatementState::Prepared);
        Ok(self)
    }

    /// Executes the statement, preparing it first if needed.
    ///
    /// Whether executing an already executed statement re-runs it is decided
    /// by the driver.
    pub fn execute(&self) -> Result<&Self> {
        self.prepare()?;
        debug!("execute: {}", self.inner.sql);
        self.inner.handle.borrow_mut().execute()?;
        self.inner.state.set(StatementState::Executed);
        self.inner.results_taken.set(false);
        Ok(self)
    }

    /// Opens a rowset over the results using the database's batch size,
    /// executing the statement first if it has not run yet.
    pub fn rows(&self) -> Result<Rowset<D>> {
        self.rows_with_batch_size(self.database().batch_size())
    }

    /// Like [`rows`](Self::rows) with an explicit batch size.
    ///
    /// # Errors
    ///
    /// Returns a usage error if `batch_size` is 0, or if another rowset
    /// already holds the results of the current execution. Call
    /// [`execute`](Self::execute) again to get a fresh result set.
    pub fn rows_with_batch_size(&self, batch_size: usize) -> Result<Rowset<D>> {
        if batch_size == 0 {
            return Err(DatabaseError::usage("batch size must be at least 1"));
        }
        if !self.is_executed() {
            self.execute()?;
        } else if self.inner.results_taken.get() {
            return Err(DatabaseError::usage(
                "statement results are already open in another rowset",
            ));
        }
        self.inner.results_taken.set(true);
        Rowset::open(self, batch_size)
    }

    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    pub fn state(&self) -> StatementState {
        self.inner.state.get()
    }

    pub fn is_executed(&self) -> bool {
        self.state() == StatementState::Executed
    }

    /// Number of bound parameters reported by the driver.
    pub fn binds(&self) -> usize {
        self.inner.handle.borrow().binds()
    }

    pub fn connection(&self) -> &Connection<D> {
        &self.inner.connection
    }

    pub fn database(&self) -> Database<D> {
        self.inner.connection.database()
    }

    pub(crate) fn handle_mut(&self) -> RefMut<'_, D::Statement> {
        self.inner.handle.borrow_mut()
    }

    /// Puts the driver statement back into its executable state once its
    /// results are exhausted.
    pub(crate) fn reset(&self) -> Result<()> {
        debug!("reset: {}", self.inner.sql);
        self.inner.handle.borrow_mut().reset()?;
        self.inner.state.set(StatementState::Prepared);
        self.inner.results_taken.set(false);
        Ok(())
    }
}
