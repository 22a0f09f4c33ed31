//! Errors raised while building statements or decoding rows.

/// Errors produced before a statement reaches the driver, or while turning
/// driver values back into rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A condition or ordering references a column of another table.
    #[error("invalid where clause: column {column_table}.{column} cannot be used against table {table}")]
    InvalidWhereClause {
        /// The table being queried.
        table: &'static str,
        /// The table that owns the offending column.
        column_table: &'static str,
        /// The offending column.
        column: &'static str,
    },

    /// A stored value could not be converted to the declared column type.
    #[error("cannot decode column {column}: expected {expected}, found {found}")]
    Decode {
        /// Column being decoded.
        column: &'static str,
        /// Rust type the column declares.
        expected: &'static str,
        /// Storage class actually returned.
        found: &'static str,
    },

    /// A row did not carry one value per declared column.
    #[error("row has {found} values but the table declares {expected} columns")]
    ColumnCount {
        /// Declared column count.
        expected: usize,
        /// Values present in the row.
        found: usize,
    },

    /// An UPDATE was requested without assigning any field.
    #[error("update on {table} does not assign any column")]
    EmptyUpdate {
        /// Table being updated.
        table: &'static str,
    },
}

/// Result alias for statement building and decoding.
pub type Result<T> = std::result::Result<T, CoreError>;
