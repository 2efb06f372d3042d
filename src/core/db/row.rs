//! Row and field views onto a rowset's current position.
//!
//! A [`Row`] is only meaningful while the rowset still sits on the row it was
//! taken from. Advancing the rowset makes earlier rows stale; reading through
//! a stale row fails with a usage error instead of returning a later row's
//! data.

use crate::core::db::rowset::{Cursor, Layout};
use crate::core::value::{Bind, Value, ValueType};
use crate::core::{CalendarDate, DatabaseError, Result};
use crate::driver::{Driver, NativeType, RowsetHandle};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Coordinates of one value in the driver's current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    bind: Bind,
    row_index: usize,
}

impl Cell {
    pub fn new(bind: Bind, row_index: usize) -> Self {
        Cell { bind, row_index }
    }

    pub fn bind(&self) -> &Bind {
        &self.bind
    }

    /// Row offset within the current batch.
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn column(&self) -> usize {
        self.bind.column
    }

    pub fn value_type(&self) -> ValueType {
        self.bind.value_type
    }
}

/// Conversion from a driver's cell into a Rust value.
///
/// Implemented for `i64`, `i32`, `String`, [`CalendarDate`], [`Value`], and
/// `Option<T>` of any of these.
pub trait FromField: Sized {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self>;
}

impl FromField for i64 {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        rowset.get_int(cell)
    }
}

impl FromField for i32 {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        let value = rowset.get_int(cell)?;
        i32::try_from(value).map_err(|_| DatabaseError::type_error(format!("integer out of range: {}", value)))
    }
}

impl FromField for String {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        rowset.get_string(cell)
    }
}

impl FromField for CalendarDate {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        rowset.get_date(cell)
    }
}

impl FromField for Value {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        if rowset.is_null(cell) {
            return Ok(Value::Null);
        }
        match cell.value_type() {
            ValueType::Int => rowset.get_int(cell).map(Value::Int),
            ValueType::String => rowset.get_string(cell).map(Value::Text),
            ValueType::Date => rowset.get_date(cell).map(Value::Date),
            other => Err(DatabaseError::unsupported_type(other)),
        }
    }
}

impl<T: FromField> FromField for Option<T> {
    fn from_field<R: RowsetHandle>(rowset: &R, cell: &Cell) -> Result<Self> {
        if rowset.is_null(cell) {
            Ok(None)
        } else {
            T::from_field(rowset, cell).map(Some)
        }
    }
}

/// The rowset's current row.
pub struct Row<D: Driver> {
    cursor: Rc<RefCell<Cursor<D>>>,
    layout: Rc<Layout<NativeType<D>>>,
    generation: u64,
}

impl<D: Driver> fmt::Debug for Row<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("width", &self.width())
            .field("current", &self.is_current())
            .finish()
    }
}

impl<D: Driver> Row<D> {
    pub(crate) fn new(cursor: Rc<RefCell<Cursor<D>>>, layout: Rc<Layout<NativeType<D>>>, generation: u64) -> Self {
        Row {
            cursor,
            layout,
            generation,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.layout.binds.len()
    }

    /// Whether the rowset is still positioned on this row.
    pub fn is_current(&self) -> bool {
        let cursor = self.cursor.borrow();
        !cursor.empty && cursor.generation == self.generation
    }

    /// Field at column `index`.
    ///
    /// # Errors
    ///
    /// Usage errors for a stale row or an index at or past [`width`](Self::width).
    pub fn field(&self, index: usize) -> Result<Field<'_, D>> {
        let cursor = self.current()?;
        let bind = *self
            .layout
            .binds
            .get(index)
            .ok_or_else(|| DatabaseError::usage(format!("column index out of range: {}", index)))?;
        Ok(Field {
            row: self,
            cell: Cell::new(bind, cursor.row_index),
        })
    }

    /// Converts column `index` of this row.
    pub fn get<T: FromField>(&self, index: usize) -> Result<T> {
        self.field(index)?.get()
    }

    /// Fields of this row in column order.
    pub fn fields(&self) -> Result<Vec<Field<'_, D>>> {
        (0..self.width()).map(|i| self.field(i)).collect()
    }

    fn current(&self) -> Result<Ref<'_, Cursor<D>>> {
        let cursor = self.cursor.borrow();
        if cursor.empty || cursor.generation != self.generation {
            return Err(DatabaseError::stale_row());
        }
        Ok(cursor)
    }
}

/// One column of a [`Row`].
pub struct Field<'r, D: Driver> {
    row: &'r Row<D>,
    cell: Cell,
}

impl<D: Driver> fmt::Debug for Field<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name())
            .field("cell", &self.cell)
            .finish()
    }
}

impl<'r, D: Driver> Field<'r, D> {
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn value_type(&self) -> ValueType {
        self.cell.value_type()
    }

    /// Column name as reported by the backend.
    pub fn name(&self) -> &'r str {
        &self.row.layout.describe[self.cell.column()].name
    }

    /// Converts the value, failing with a usage error if the row went stale.
    pub fn get<T: FromField>(&self) -> Result<T> {
        let cursor = self.row.current()?;
        T::from_field(&cursor.handle, &self.cell)
    }

    pub fn as_string(&self) -> Result<String> {
        self.get()
    }

    pub fn is_null(&self) -> Result<bool> {
        let cursor = self.row.current()?;
        Ok(cursor.handle.is_null(&self.cell))
    }

    /// Renders the value according to the column's semantic type.
    ///
    /// # Errors
    ///
    /// Returns a type error naming the tag for columns bound as anything
    /// other than int, string or date.
    pub fn to_text(&self) -> Result<String> {
        match self.value_type() {
            ValueType::Int => Ok(self.get::<i64>()?.to_string()),
            ValueType::String => self.get::<String>(),
            ValueType::Date => Ok(self.get::<CalendarDate>()?.to_string()),
            other => Err(DatabaseError::unsupported_type(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::Database;
    use crate::test_utils::{self, MemDriver, MemResult, MemType, MemValue};

    fn scores(sql: &str) {
        test_utils::script(
            sql,
            MemResult::rows(
                &[
                    ("name", MemType::Text),
                    ("score", MemType::Int),
                    ("d", MemType::Date),
                    ("doc", MemType::Json),
                ],
                vec![
                    vec!["Knuth".into(), MemValue::Int(62), "2016-01-01".into(), "{}".into()],
                    vec!["Hopper".into(), MemValue::Null, MemValue::Null, "[]".into()],
                ],
            ),
        );
    }

    fn database() -> Database<MemDriver> {
        Database::open("mem://local/db").unwrap()
    }

    #[test]
    fn test_typed_access() {
        scores("select * from score");
        let mut rs = database().query("select * from score").unwrap().rows().unwrap();
        let row = rs.front().unwrap();

        assert_eq!(row.width(), 4);
        assert_eq!(row.get::<String>(0).unwrap(), "Knuth");
        assert_eq!(row.get::<i64>(1).unwrap(), 62);
        assert_eq!(row.get::<i32>(1).unwrap(), 62);
        assert_eq!(row.get::<CalendarDate>(2).unwrap(), CalendarDate::new(2016, 1, 1));
        assert_eq!(row.get::<Value>(0).unwrap(), Value::Text("Knuth".into()));
        assert_eq!(row.get::<Option<i64>>(1).unwrap(), Some(62));

        let field = row.field(1).unwrap();
        assert_eq!(field.name(), "score");
        assert_eq!(field.value_type(), ValueType::Int);
        assert_eq!(field.as_string().unwrap(), "62");
        assert_eq!(field.to_text().unwrap(), "62");
        assert_eq!(row.field(2).unwrap().to_text().unwrap(), "2016-01-01");

        assert!(rs.next().unwrap());
        let row = rs.front().unwrap();
        assert_eq!(row.get::<Option<i64>>(1).unwrap(), None);
        assert_eq!(row.get::<Value>(2).unwrap(), Value::Null);
        assert!(row.field(1).unwrap().is_null().unwrap());
        assert_eq!(row.get::<i64>(1).unwrap(), 0);
    }

    #[test]
    fn test_field_errors() {
        scores("select * from score2");
        let rs = database().query("select * from score2").unwrap().rows().unwrap();
        let row = rs.front().unwrap();

        assert!(row.field(4).unwrap_err().is_usage());
        assert!(row.get::<i64>(0).unwrap_err().is_type_error());

        let doc = row.field(3).unwrap();
        assert_eq!(doc.value_type(), ValueType::Variant);
        let err = doc.to_text().unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.message(), "unsupported type: variant");
        assert!(row.get::<Value>(3).is_err());
    }

    #[test]
    fn test_i32_range() {
        test_utils::script(
            "select big from t",
            MemResult::rows(&[("big", MemType::Int)], vec![vec![MemValue::Int(1 << 40)]]),
        );
        let rs = database().query("select big from t").unwrap().rows().unwrap();
        let row = rs.front().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1 << 40);
        assert!(row.get::<i32>(0).unwrap_err().is_type_error());
    }

    #[test]
    fn test_stale_row() {
        scores("select * from score3");
        let mut rs = database().query("select * from score3").unwrap().rows().unwrap();
        let first = rs.front().unwrap();
        assert!(first.is_current());

        assert!(rs.next().unwrap());
        assert!(!first.is_current());
        assert!(first.field(0).unwrap_err().is_usage());

        let second = rs.front().unwrap();
        assert_eq!(second.get::<String>(0).unwrap(), "Hopper");

        assert!(!rs.next().unwrap());
        assert!(!second.is_current());
        assert!(second.get::<String>(0).is_err());
    }
}
