//! Schema traits for typed tables, columns and change-tracked writers.
//!
//! These traits are implemented by the `#[derive(Table)]` macro. A table
//! type carries its SQL name, its ordered column list, how to decode a
//! row, and which writer ("inserter") produces INSERT and UPDATE
//! assignments for it.

use std::any::TypeId;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::value::{FromSqlValue, SqlValue};

/// Trait for table metadata.
///
/// Implemented by the `<Row>Table` types generated from `#[derive(Table)]`.
pub trait Table: 'static {
    /// The row type read back by SELECT (the original struct).
    type Row: Send + 'static;

    /// The change-tracked writer used by INSERT and UPDATE.
    type Inserter: Inserter + Default + Send;

    /// The SQL table name.
    const NAME: &'static str;

    /// All column names, in declaration order.
    const COLUMNS: &'static [&'static str];

    /// The primary key column name, if any.
    const PRIMARY_KEY: Option<&'static str>;

    /// Decodes one row, given one value per entry of [`Table::COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ColumnCount`] or [`CoreError::Decode`] when the
    /// values do not match the declared columns.
    fn decode_row(values: Vec<SqlValue>) -> Result<Self::Row>;

    /// Fills columns computed from other assigned columns.
    ///
    /// Runs before every INSERT and UPDATE.
    fn derive_fields(_inserter: &mut Self::Inserter) {}

    /// Returns the runtime identity of this table.
    #[must_use]
    fn table_id() -> TableId
    where
        Self: Sized,
    {
        TableId::of::<Self>()
    }
}

/// Trait for column metadata.
///
/// Implemented by the zero-sized column types generated into the
/// `<Row>Columns` module.
pub trait Column: Copy + 'static {
    /// The table this column belongs to.
    type Table: Table;

    /// The Rust type of this column.
    type Type;

    /// The SQL column name.
    const NAME: &'static str;

    /// Whether this column is nullable.
    const NULLABLE: bool;

    /// Whether this column is the primary key.
    const PRIMARY_KEY: bool;

    /// Returns the runtime handle used inside conditions and orderings.
    #[must_use]
    fn column_ref(self) -> ColumnRef {
        ColumnRef {
            table: TableId::of::<Self::Table>(),
            name: Self::NAME,
        }
    }
}

/// A change-tracked row writer.
///
/// Each field is an `Option`; a field is "changed" exactly when it is
/// `Some`. Unset fields never appear in emitted statements.
pub trait Inserter {
    /// Names of the assigned columns, in declaration order.
    fn changed_columns(&self) -> Vec<&'static str>;

    /// Consumes the writer, yielding the assigned columns and their values.
    fn into_assignments(self) -> Vec<(&'static str, SqlValue)>;

    /// Returns true when no field was assigned.
    fn is_empty(&self) -> bool {
        self.changed_columns().is_empty()
    }
}

/// Runtime identity of a table type.
///
/// Two tables with the same SQL name declared in different schemas are
/// different tables.
#[derive(Clone, Copy)]
pub struct TableId {
    type_id: TypeId,
    name: &'static str,
}

impl TableId {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: Table>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }

    /// The SQL name of the table.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TableId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TableId {}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableId").field(&self.name).finish()
    }
}

/// A column handle, identified by its owning table and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    /// Owning table.
    pub table: TableId,
    /// SQL column name.
    pub name: &'static str,
}

impl ColumnRef {
    /// Checks that this column belongs to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidWhereClause`] for a foreign column.
    pub fn check_owner(&self, table: TableId) -> Result<()> {
        if self.table == table {
            Ok(())
        } else {
            Err(CoreError::InvalidWhereClause {
                table: table.name(),
                column_table: self.table.name(),
                column: self.name,
            })
        }
    }
}

/// Static description of one table, used by schema registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    /// SQL table name.
    pub name: &'static str,
    /// Column names in declaration order.
    pub columns: &'static [&'static str],
    /// Primary key column, if any.
    pub primary_key: Option<&'static str>,
}

impl TableInfo {
    /// Describes `T`.
    #[must_use]
    pub const fn of<T: Table>() -> Self {
        Self {
            name: T::NAME,
            columns: T::COLUMNS,
            primary_key: T::PRIMARY_KEY,
        }
    }
}

/// Reads the next column of a row being decoded.
///
/// Used by generated `decode_row` implementations.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] when the value does not fit `T`.
pub fn decode_column<T: FromSqlValue>(
    values: &mut impl Iterator<Item = SqlValue>,
    column: &'static str,
) -> Result<T> {
    T::from_sql_value(values.next().unwrap_or(SqlValue::Null), column)
}

/// Checks the value count of a row against the table's columns.
///
/// # Errors
///
/// Returns [`CoreError::ColumnCount`] on mismatch.
pub fn check_column_count<T: Table>(values: &[SqlValue]) -> Result<()> {
    if values.len() == T::COLUMNS.len() {
        Ok(())
    } else {
        Err(CoreError::ColumnCount {
            expected: T::COLUMNS.len(),
            found: values.len(),
        })
    }
}
