//! Semantic value types and column binding.
//!
//! Backends describe columns in their own type systems. The front layer only
//! understands the closed [`ValueType`] tag set; each driver publishes an
//! ordered table of [`TypeRule`]s translating its native tags into it.

use crate::core::CalendarDate;
use std::fmt;
use tracing::debug;

/// The backend-independent tag set used to pick a conversion routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    #[default]
    Undefined,
    Int,
    String,
    Date,
    Variant,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Int => "int",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Variant => "variant",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converted cell value of whatever type the column declares.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Date(CalendarDate),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d),
        }
    }
}

/// How a driver holds a column's data for the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Fixed-width slot of the given byte size per row
    Fixed(usize),
    /// Length varies per value
    Variable,
}

/// Per-column metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Describe<N> {
    pub name: String,
    pub native_type: N,
}

/// Per-column binding: the semantic type plus where the driver keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bind {
    pub value_type: ValueType,
    /// Column position in the driver's buffer
    pub column: usize,
    pub storage: Storage,
}

/// Which native types a [`TypeRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMatch<N: 'static> {
    Exact(N),
    /// Matches anything; belongs at the end of a table.
    Fallback,
}

/// One row of a driver's ordered native → semantic type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRule<N: 'static> {
    pub native: NativeMatch<N>,
    pub value_type: ValueType,
    pub storage: Storage,
}

impl<N: PartialEq> TypeRule<N> {
    /// Unmatched native types degrade to strings instead of failing.
    pub const fn string_fallback() -> Self {
        TypeRule {
            native: NativeMatch::Fallback,
            value_type: ValueType::String,
            storage: Storage::Variable,
        }
    }

    pub fn matches(&self, native: &N) -> bool {
        match &self.native {
            NativeMatch::Exact(n) => n == native,
            NativeMatch::Fallback => true,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.native, NativeMatch::Fallback)
    }
}

/// First rule in `rules` matching `native`.
pub fn resolve<'r, N: PartialEq>(rules: &'r [TypeRule<N>], native: &N) -> Option<&'r TypeRule<N>> {
    rules.iter().find(|rule| rule.matches(native))
}

/// Builds the bind vector for `describe` from a driver's type table.
///
/// A table without a matching rule still binds the column as a string, the
/// same outcome as [`TypeRule::string_fallback`].
pub fn bind_columns<N: PartialEq + fmt::Debug>(rules: &[TypeRule<N>], describe: &[Describe<N>]) -> Vec<Bind> {
    describe
        .iter()
        .enumerate()
        .map(|(column, d)| {
            let (value_type, storage) = match resolve(rules, &d.native_type) {
                Some(rule) => (rule.value_type, rule.storage),
                None => {
                    debug!("no type rule for {:?}, binding as string", d.native_type);
                    let fallback = TypeRule::<N>::string_fallback();
                    (fallback.value_type, fallback.storage)
                }
            };
            debug!(
                "bind: column {} ({}), native {:?} -> {}",
                column, d.name, d.native_type, value_type
            );
            Bind {
                value_type,
                column,
                storage,
            }
        })
        .collect()
}
