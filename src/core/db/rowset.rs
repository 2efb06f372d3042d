//! Forward-only cursor over a statement's results.
//!
//! The driver delivers rows in batches of up to `batch_size`. The rowset
//! walks the current batch and asks the driver for the next one once it runs
//! off the end. When the driver reports no more rows the rowset becomes empty
//! and stays empty, and the statement is reset so it can run again.

use crate::core::db::{Row, Statement};
use crate::core::value::{bind_columns, Bind, Describe};
use crate::core::Result;
use crate::driver::{Driver, NativeType, RowsetHandle};
use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;
use tracing::{debug, trace};

/// Mutable cursor state shared between a rowset and the rows it hands out.
pub(crate) struct Cursor<D: Driver> {
    pub(crate) handle: D::Rowset,
    statement: Statement<D>,
    rows_fetched: usize,
    pub(crate) row_index: usize,
    /// Bumped on every advance; rows remember the value they were taken at.
    pub(crate) generation: u64,
    pub(crate) empty: bool,
}

impl<D: Driver> Cursor<D> {
    fn finish(&mut self) -> Result<()> {
        debug!("rowset exhausted: {}", self.statement.sql());
        self.empty = true;
        self.generation += 1;
        self.statement.reset()
    }
}

/// Column metadata fixed when the rowset opens.
pub(crate) struct Layout<N> {
    pub(crate) describe: Vec<Describe<N>>,
    pub(crate) binds: Vec<Bind>,
}

pub struct Rowset<D: Driver> {
    cursor: Rc<RefCell<Cursor<D>>>,
    layout: Rc<Layout<NativeType<D>>>,
}

impl<D: Driver> fmt::Debug for Rowset<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursor = self.cursor.borrow();
        f.debug_struct("Rowset")
            .field("columns", &self.layout.describe)
            .field("rows_fetched", &cursor.rows_fetched)
            .field("row_index", &cursor.row_index)
            .field("empty", &cursor.empty)
            .finish()
    }
}

impl<D: Driver> Rowset<D> {
    /// Opens a rowset over an executed statement and fetches the first batch.
    pub(crate) fn open(statement: &Statement<D>, batch_size: usize) -> Result<Self> {
        let mut handle = D::Rowset::open(&mut *statement.handle_mut(), batch_size)?;
        let columns = handle.columns();

        let describe = (0..columns)
            .map(|i| {
                Ok(Describe {
                    name: handle.name(i)?,
                    native_type: handle.native_type(i),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let binds = bind_columns(D::Rowset::type_map(), &describe);

        let rows_fetched = if columns == 0 { 0 } else { handle.fetch()? };
        trace!("rowset open: {} columns, first batch {} rows", columns, rows_fetched);

        let mut cursor = Cursor {
            handle,
            statement: statement.clone(),
            rows_fetched,
            row_index: 0,
            generation: 0,
            empty: false,
        };
        if rows_fetched == 0 {
            cursor.finish()?;
        }

        Ok(Rowset {
            cursor: Rc::new(RefCell::new(cursor)),
            layout: Rc::new(Layout { describe, binds }),
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.layout.binds.len()
    }

    /// True once no rows remain. Never becomes false again.
    pub fn is_empty(&self) -> bool {
        self.cursor.borrow().empty
    }

    /// Advances to the next row, fetching a new batch when the current one is
    /// used up.
    ///
    /// Returns `Ok(false)` once exhausted; further calls keep returning it
    /// without touching the driver. A failed fetch also leaves the rowset
    /// empty.
    pub fn next(&mut self) -> Result<bool> {
        let cursor = &mut *self.cursor.borrow_mut();
        if cursor.empty {
            return Ok(false);
        }
        cursor.generation += 1;
        cursor.row_index += 1;
        if cursor.row_index < cursor.rows_fetched {
            return Ok(true);
        }

        match cursor.handle.next() {
            Ok(0) => {
                cursor.finish()?;
                Ok(false)
            }
            Ok(n) => {
                trace!("rowset batch: {} rows", n);
                cursor.rows_fetched = n;
                cursor.row_index = 0;
                Ok(true)
            }
            Err(e) => {
                cursor.empty = true;
                Err(e)
            }
        }
    }

    /// The current row, or `None` once the rowset is empty.
    pub fn front(&self) -> Option<Row<D>> {
        let cursor = self.cursor.borrow();
        if cursor.empty {
            return None;
        }
        Some(Row::new(Rc::clone(&self.cursor), Rc::clone(&self.layout), cursor.generation))
    }

    /// Iterates from the current row to the end.
    pub fn rows(&mut self) -> Rows<'_, D> {
        Rows {
            rowset: Some(self),
            started: false,
        }
    }

    pub fn describe(&self) -> &[Describe<NativeType<D>>] {
        &self.layout.describe
    }

    pub fn binds(&self) -> &[Bind] {
        &self.layout.binds
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.layout.describe.get(index).map(|d| d.name.as_str())
    }

    /// Position of the first column named `name`, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.layout
            .describe
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Dumps the remaining rows as comma-separated text between `+--` rules.
    pub fn write<W: io::Write>(mut self, out: &mut W) -> Result<()> {
        writeln!(out, "+--")?;
        for row in self.rows() {
            let row = row?;
            let line = row
                .fields()?
                .iter()
                .map(|f| f.to_text())
                .collect::<Result<Vec<_>>>()?
                .join(",");
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "+--")?;
        Ok(())
    }
}

/// Iterator over a rowset's rows.
///
/// Each item is the rowset's current row; the iterator advances the rowset
/// before yielding all but the first. Two iterators compare equal when both
/// are live or both are finished, so any finished iterator equals
/// [`Rows::end`].
pub struct Rows<'a, D: Driver> {
    rowset: Option<&'a mut Rowset<D>>,
    started: bool,
}

impl<'a, D: Driver> Rows<'a, D> {
    /// An iterator that is already finished.
    pub fn end() -> Self {
        Rows {
            rowset: None,
            started: true,
        }
    }

    fn is_live(&self) -> bool {
        self.rowset.as_ref().is_some_and(|rs| !rs.is_empty())
    }
}

impl<D: Driver> PartialEq for Rows<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.is_live() == other.is_live()
    }
}

impl<D: Driver> fmt::Debug for Rows<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows").field("live", &self.is_live()).finish()
    }
}

impl<D: Driver> Iterator for Rows<'_, D> {
    type Item = Result<Row<D>>;

    fn next(&mut self) -> Option<Self::Item> {
        let rowset = self.rowset.take()?;
        if self.started {
            match rowset.next() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
        self.started = true;
        let row = rowset.front()?;
        self.rowset = Some(rowset);
        Some(Ok(row))
    }
}
