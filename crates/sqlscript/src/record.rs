//! Record metadata and column reflection.
//!
//! A [`Record`] describes how a struct maps onto a table: one
//! [`ColumnDescriptor`] per participating field, in declaration order, and the
//! field values in the same order. `#[derive(Record)]` generates both.
//!
//! ```ignore
//! #[derive(Record, Serialize)]
//! #[record(table = "news")]
//! struct News {
//!     #[record(key)]
//!     id: Option<i64>,
//!     title: Option<String>,
//!     #[record(column = "author_id")]
//!     author: Option<i64>,
//!     #[record(in)]
//!     status: Option<Vec<i32>>,
//!     #[record(skip)]
//!     cached_html: Option<String>,
//! }
//! ```

use crate::error::{BuildError, BuildResult};
use crate::param::Value;

/// How a field compares in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Membership {
    /// `column = :field`
    #[default]
    Plain,
    /// `column IN (...)` over the field's list value.
    In,
}

/// Mapping of one record field onto a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    /// Field name, also the parameter name (`:field`).
    pub field: &'static str,
    /// Physical column name.
    pub column: &'static str,
    /// Owning table, when the column should be qualified.
    pub table: Option<&'static str>,
    pub membership: Membership,
    /// Identity field: left out of INSERT, used as the UPDATE/DELETE key.
    pub key: bool,
}

impl ColumnDescriptor {
    pub const fn new(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            table: None,
            membership: Membership::Plain,
            key: false,
        }
    }

    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub const fn in_list(mut self) -> Self {
        self.membership = Membership::In;
        self
    }

    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// `table.column`, or just `column` without an owning table.
    pub fn qualified(&self) -> String {
        match self.table {
            Some(table) => format!("{table}.{}", self.column),
            None => self.column.to_string(),
        }
    }
}

/// A struct that maps onto a table.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record {
    /// Default table name.
    const TABLE: &'static str;

    /// Column descriptors in field declaration order.
    fn columns() -> &'static [ColumnDescriptor];

    /// Field values in the same order as [`Record::columns`].
    fn field_values(&self) -> BuildResult<Vec<Value>>;
}

impl<R: Record> Record for &R {
    const TABLE: &'static str = R::TABLE;

    fn columns() -> &'static [ColumnDescriptor] {
        R::columns()
    }

    fn field_values(&self) -> BuildResult<Vec<Value>> {
        (**self).field_values()
    }
}

// ==================== Column reflection ====================

/// One field of a record instance with its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedField {
    pub descriptor: &'static ColumnDescriptor,
    pub value: Value,
}

impl ReflectedField {
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn field(&self) -> &'static str {
        self.descriptor.field
    }
}

/// Pair every field value of `record` with its descriptor.
///
/// Fails when the record reports a different number of values than it has
/// descriptors, i.e. some participating field has no column metadata.
pub fn reflect<R: Record>(record: &R) -> BuildResult<Vec<ReflectedField>> {
    let columns = R::columns();
    let values = record.field_values()?;
    if values.len() != columns.len() {
        return Err(BuildError::configuration(format!(
            "Record `{}` reports {} field values but declares {} columns; every participating field needs column metadata",
            R::TABLE,
            values.len(),
            columns.len()
        )));
    }
    Ok(columns
        .iter()
        .zip(values)
        .map(|(descriptor, value)| ReflectedField { descriptor, value })
        .collect())
}

/// Comma-separated result columns in field order, qualified where a
/// descriptor names its table.
pub fn result_columns<R: Record>() -> String {
    R::columns()
        .iter()
        .map(ColumnDescriptor::qualified)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Columns eligible for INSERT (everything but key fields).
pub fn insert_columns<R: Record>() -> impl Iterator<Item = &'static ColumnDescriptor> {
    R::columns().iter().filter(|c| !c.key)
}

/// Declared key columns.
pub fn key_columns<R: Record>() -> impl Iterator<Item = &'static ColumnDescriptor> {
    R::columns().iter().filter(|c| c.key)
}

/// Look up a descriptor by field name.
pub fn descriptor<R: Record>(field: &str) -> Option<&'static ColumnDescriptor> {
    R::columns().iter().find(|c| c.field == field)
}
