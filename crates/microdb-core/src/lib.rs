//! # microdb-core
//!
//! Driver-agnostic building blocks for typed embedded databases.
//!
//! This crate provides:
//! - [`SqlValue`] with [`ToSqlValue`] / [`FromSqlValue`] conversions,
//!   including tick-encoded timestamps and blob-encoded UUIDs
//! - [`Table`] and [`Column`] traits, implemented by `#[derive(Table)]`
//! - The [`Condition`] algebra, compiled to parameterized WHERE clauses
//! - Change-tracked writers ([`Inserter`]) that only emit assigned columns
//! - Statement builders for SELECT, INSERT, UPDATE, DELETE and COUNT
//!
//! ## Same-table Conditions
//!
//! Conditions carry the identity of the table each column belongs to.
//! Building a statement for one table with a column of another fails
//! before any SQL is produced:
//!
//! ```ignore
//! let cond = FileTable::name().eq("report.pdf");
//! let err = statement::delete::<PermissionTable>(Some(&cond)).unwrap_err();
//! assert!(matches!(err, CoreError::InvalidWhereClause { .. }));
//! ```

pub mod condition;
mod enums;
pub mod error;
pub mod schema;
pub mod statement;
pub mod ticks;
pub mod value;

pub use condition::{BoolOp, ColumnExt, CompareOp, Condition, WhereClause};
pub use error::CoreError;
pub use schema::{Column, ColumnRef, Inserter, Table, TableId, TableInfo};
pub use statement::{Query, SortOrder, Statement};
pub use value::{FromSqlValue, SqlValue, ToSqlValue};
