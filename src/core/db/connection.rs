//! Database and Connection handles.
//!
//! A [`Database`] holds the driver's global state and the configured URI.
//! Every [`Connection`] opened from it keeps it alive; the backend session
//! closes when the last holder of the connection goes away.

use crate::config::DatabaseConfig;
use crate::core::db::{Statement, DEFAULT_BATCH_SIZE};
use crate::core::{DatabaseError, Result, Source};
use crate::driver::{ConnectionHandle, DatabaseHandle, Driver};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

struct DatabaseInner<D: Driver> {
    handle: D::Database,
    uri: String,
    batch_size: usize,
}

/// Shared handle to a backend configuration. Cloning is cheap.
pub struct Database<D: Driver> {
    inner: Rc<DatabaseInner<D>>,
}

impl<D: Driver> Clone for Database<D> {
    fn clone(&self) -> Self {
        Database {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Driver> fmt::Debug for Database<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &D::NAME)
            .field("uri", &self.inner.uri)
            .field("batch_size", &self.inner.batch_size)
            .finish()
    }
}

impl<D: Driver> Database<D> {
    /// Creates a database without a default URI.
    pub fn new() -> Result<Self> {
        Self::with_settings(String::new(), DEFAULT_BATCH_SIZE)
    }

    /// Creates a database whose connections default to `uri`.
    ///
    /// The URI is parsed when a connection is opened, not here.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stddb::{Database, Sqlite};
    ///
    /// let db = Database::<Sqlite>::open("file://scores.sqlite")?;
    /// let _rowset = db.query("select name, score from score")?.rows()?;
    /// # Ok::<(), stddb::DatabaseError>(())
    /// ```
    pub fn open(uri: &str) -> Result<Self> {
        Self::with_settings(uri.to_string(), DEFAULT_BATCH_SIZE)
    }

    /// Creates a database from the `[database]` config section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let batch_size = config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(DatabaseError::config("batch_size must be at least 1"));
        }
        Self::with_settings(config.uri.clone(), batch_size)
    }

    fn with_settings(uri: String, batch_size: usize) -> Result<Self> {
        debug!("{}: creating database (uri: {:?})", D::NAME, uri);
        Ok(Database {
            inner: Rc::new(DatabaseInner {
                handle: D::Database::new()?,
                uri,
                batch_size,
            }),
        })
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    /// How this backend spells a calendar-date column type in DDL.
    pub fn date_column_type(&self) -> &'static str {
        self.inner.handle.date_column_type()
    }

    pub fn handle(&self) -> &D::Database {
        &self.inner.handle
    }

    /// Opens a new connection to the configured URI.
    pub fn connection(&self) -> Result<Connection<D>> {
        Connection::open(self, self.uri())
    }

    /// Opens a connection to `uri`, or to the configured URI if `uri` is empty.
    pub fn connection_to(&self, uri: &str) -> Result<Connection<D>> {
        let uri = if uri.is_empty() { self.uri() } else { uri };
        Connection::open(self, uri)
    }

    /// Prepares `sql` on a fresh connection.
    pub fn statement(&self, sql: &str) -> Result<Statement<D>> {
        self.connection()?.statement(sql)
    }

    /// Prepares and executes `sql` on a fresh connection.
    pub fn query(&self, sql: &str) -> Result<Statement<D>> {
        let stmt = self.statement(sql)?;
        stmt.execute()?;
        Ok(stmt)
    }
}

struct ConnectionInner<D: Driver> {
    database: Database<D>,
    source: Source,
    handle: D::Connection,
}

/// An open backend session. Cloning shares the same session.
pub struct Connection<D: Driver> {
    inner: Rc<ConnectionInner<D>>,
}

impl<D: Driver> Clone for Connection<D> {
    fn clone(&self) -> Self {
        Connection {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &D::NAME)
            .field("source", &self.inner.source)
            .finish()
    }
}

impl<D: Driver> Connection<D> {
    fn open(database: &Database<D>, uri: &str) -> Result<Self> {
        let source = Source::parse(uri)?;
        debug!("{}: connecting to {}", D::NAME, source);
        let handle = D::Connection::open(database.handle(), &source)?;
        Ok(Connection {
            inner: Rc::new(ConnectionInner {
                database: database.clone(),
                source,
                handle,
            }),
        })
    }

    pub fn database(&self) -> Database<D> {
        self.inner.database.clone()
    }

    pub fn source(&self) -> &Source {
        &self.inner.source
    }

    pub fn handle(&self) -> &D::Connection {
        &self.inner.handle
    }

    /// Creates and prepares a statement on this connection.
    pub fn statement(&self, sql: &str) -> Result<Statement<D>> {
        Statement::new(self, sql)
    }

    /// Prepares and executes `sql`.
    pub fn query(&self, sql: &str) -> Result<Statement<D>> {
        let stmt = self.statement(sql)?;
        stmt.execute()?;
        Ok(stmt)
    }
}
