//! stddb Error Module
//!
//! A single error type crosses every layer of the library. It always carries
//! a human message and, when a backend call failed, the backend status code
//! and native error text.

use std::fmt;
use std::io;
use thiserror::Error;

/// Classification of a [`DatabaseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed connection descriptor, unsupported protocol, bad config file
    Config,
    /// Backend session could not be established
    Connection,
    /// Prepare or execute failure
    Statement,
    /// A fetch reported an error status other than "no more data"
    Fetch,
    /// Unsupported or mismatched semantic type requested from a field
    Type,
    /// Malformed date text
    DateParse,
    /// Caller misuse: stale row views, column index out of range
    Usage,
    /// Failure writing diagnostic output
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "configuration",
            ErrorKind::Connection => "connection",
            ErrorKind::Statement => "statement",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Type => "type",
            ErrorKind::DateParse => "date parse",
            ErrorKind::Usage => "usage",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type exposed to callers.
///
/// `Display` renders a single line:
/// `message: <message>[, retcode: <code>][, driver_message: <text>]`.
/// Use [`DatabaseError::vertical`] for the boxed terminal rendering.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", summary(.message, .retcode, .driver_message))]
pub struct DatabaseError {
    kind: ErrorKind,
    message: String,
    retcode: Option<i32>,
    driver_message: Option<String>,
}

fn summary(message: &String, retcode: &Option<i32>, driver_message: &Option<String>) -> String {
    let mut s = format!("message: {}", message);
    if let Some(code) = retcode {
        s.push_str(&format!(", retcode: {}", code));
    }
    if let Some(text) = driver_message {
        s.push_str(&format!(", driver_message: {}", text));
    }
    s
}

impl DatabaseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        DatabaseError {
            kind,
            message: message.into(),
            retcode: None,
            driver_message: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Statement, message)
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// Malformed date text. Carries no copy of the input.
    pub fn date_parse() -> Self {
        Self::new(ErrorKind::DateParse, "date parse error")
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    /// A row or field used after its rowset advanced.
    pub fn stale_row() -> Self {
        Self::usage("stale row: the rowset has advanced past this row")
    }

    /// "unsupported type: <tag>" for a tag outside what the caller can handle.
    pub fn unsupported_type(tag: impl fmt::Display) -> Self {
        Self::type_error(format!("unsupported type: {}", tag))
    }

    pub fn with_retcode(mut self, retcode: i32) -> Self {
        self.retcode = Some(retcode);
        self
    }

    pub fn with_driver_message(mut self, driver_message: impl Into<String>) -> Self {
        self.driver_message = Some(driver_message.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retcode(&self) -> Option<i32> {
        self.retcode
    }

    pub fn driver_message(&self) -> Option<&str> {
        self.driver_message.as_deref()
    }

    pub fn is_config(&self) -> bool {
        self.kind == ErrorKind::Config
    }

    pub fn is_connection(&self) -> bool {
        self.kind == ErrorKind::Connection
    }

    pub fn is_statement(&self) -> bool {
        self.kind == ErrorKind::Statement
    }

    pub fn is_fetch(&self) -> bool {
        self.kind == ErrorKind::Fetch
    }

    pub fn is_type_error(&self) -> bool {
        self.kind == ErrorKind::Type
    }

    pub fn is_date_parse(&self) -> bool {
        self.kind == ErrorKind::DateParse
    }

    pub fn is_usage(&self) -> bool {
        self.kind == ErrorKind::Usage
    }

    /// Boxed multi-line rendering for terminal display.
    ///
    /// ```
    /// # use stddb::DatabaseError;
    /// let e = DatabaseError::statement("prepare").with_retcode(1);
    /// assert!(e.vertical().to_string().starts_with("+-- database error"));
    /// ```
    pub fn vertical(&self) -> Vertical<'_> {
        Vertical(self)
    }
}

impl From<io::Error> for DatabaseError {
    fn from(e: io::Error) -> Self {
        DatabaseError::new(ErrorKind::Io, "write error").with_driver_message(e.to_string())
    }
}

/// Display adapter returned by [`DatabaseError::vertical`].
#[derive(Debug)]
pub struct Vertical<'a>(&'a DatabaseError);

impl fmt::Display for Vertical<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.0;
        writeln!(f, "+-- database error -------------------------+")?;
        writeln!(f, "message: {}", e.message)?;
        writeln!(f, "driver return code: {}", e.retcode.unwrap_or(0))?;
        writeln!(f, "driver error message: {}", e.driver_message().unwrap_or(""))?;
        writeln!(f, "+-------------------------------------------+")
    }
}

/// Writes the vertical rendering of `e` to `out` and flushes it.
pub fn vertical_print<W: io::Write>(out: &mut W, e: &DatabaseError) -> io::Result<()> {
    write!(out, "{}", e.vertical())?;
    out.flush()
}

/// Type alias for Result to use DatabaseError as the error type.
pub type Result<T> = std::result::Result<T, DatabaseError>;
