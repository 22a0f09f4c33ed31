//! Conversion between [`SqlValue`] and the SQLite driver.

use microdb_core::SqlValue;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, TypeInfo, ValueRef};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Builds a driver query for `sql` with every parameter bound.
pub(crate) fn prepare(sql: &str, params: Vec<SqlValue>) -> SqliteQuery<'_> {
    params.into_iter().fold(sqlx::query(sql), bind_value)
}

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Reads every column of `row` by its storage class.
pub(crate) fn row_values(row: &SqliteRow) -> Result<Vec<SqlValue>, sqlx::Error> {
    (0..row.len()).map(|index| column_value(row, index)).collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let storage = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get_unchecked(index).map(SqlValue::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get_unchecked(index).map(SqlValue::Float),
        "BLOB" => row.try_get_unchecked(index).map(SqlValue::Blob),
        _ => row.try_get_unchecked(index).map(SqlValue::Text),
    }
}
