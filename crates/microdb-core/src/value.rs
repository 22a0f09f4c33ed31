//! SQL values and conversions to and from Rust types.
//!
//! Every value bound to a statement or read back from a row goes through
//! [`SqlValue`]. Writing uses [`ToSqlValue`]; reading uses
//! [`FromSqlValue`], which applies the NULL policy: nullable (`Option`)
//! types decode NULL to `None`, everything else decodes NULL to its
//! default.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::ticks;

/// A SQL value that can be used as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value, stored as 0/1.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the storage class name, used in decode errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int(_) => "INTEGER",
            Self::Float(_) => "REAL",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
        }
    }

    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be read back from a SQL value.
pub trait FromSqlValue: Sized {
    /// Rust type name reported in decode errors.
    const TYPE_NAME: &'static str;

    /// Converts a stored value, naming `column` in any error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the storage class cannot represent
    /// this type.
    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self>;
}

/// Builds the decode error for `T`.
pub(crate) fn mismatch<T: FromSqlValue>(column: &'static str, found: &SqlValue) -> CoreError {
    CoreError::Decode {
        column,
        expected: T::TYPE_NAME,
        found: found.kind(),
    }
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for Uuid {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.as_bytes().to_vec())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(ticks::timestamp_to_ticks(&self))
    }
}

impl ToSqlValue for Duration {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(ticks::duration_to_ticks(&self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl FromSqlValue for SqlValue {
    const TYPE_NAME: &'static str = "SqlValue";

    fn from_sql_value(value: SqlValue, _column: &'static str) -> Result<Self> {
        Ok(value)
    }
}

impl FromSqlValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(false),
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(i) => Ok(i != 0),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(0),
            SqlValue::Int(i) => Ok(i),
            SqlValue::Bool(b) => Ok(Self::from(b)),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null | SqlValue::Bool(_) | SqlValue::Int(_) => {
                let wide = i64::from_sql_value(value, column)?;
                Self::try_from(wide).map_err(|_| CoreError::Decode {
                    column,
                    expected: Self::TYPE_NAME,
                    found: "out of range INTEGER",
                })
            }
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(0.0),
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as Self),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(Self::new()),
            SqlValue::Text(s) => Ok(s),
            SqlValue::Int(i) => Ok(i.to_string()),
            SqlValue::Float(f) => Ok(f.to_string()),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(Self::new()),
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for Uuid {
    const TYPE_NAME: &'static str = "Uuid";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(Self::nil()),
            SqlValue::Blob(ref b) => Self::from_slice(b).map_err(|_| mismatch::<Self>(column, &value)),
            SqlValue::Text(ref s) => Self::parse_str(s).map_err(|_| mismatch::<Self>(column, &value)),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "DateTime<Utc>";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            // Tick zero, 0001-01-01.
            SqlValue::Null => Self::from_sql_value(SqlValue::Int(0), column),
            SqlValue::Int(t) => ticks::ticks_to_timestamp(t).ok_or(CoreError::Decode {
                column,
                expected: Self::TYPE_NAME,
                found: "out of range INTEGER",
            }),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl FromSqlValue for Duration {
    const TYPE_NAME: &'static str = "Duration";

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(Self::zero()),
            SqlValue::Int(t) => Ok(ticks::ticks_to_duration(t)),
            other => Err(mismatch::<Self>(column, &other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_sql_value(value: SqlValue, column: &'static str) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other, column).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql_value_conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(2.5_f64.to_sql_value(), SqlValue::Float(2.5));
        assert_eq!(
            "hello".to_sql_value(),
            SqlValue::Text(String::from("hello"))
        );
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
        assert_eq!(Some(42_i32).to_sql_value(), SqlValue::Int(42));
    }

    #[test]
    fn test_uuid_is_stored_as_blob() {
        let id = Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
        let value = id.to_sql_value();
        assert_eq!(value, SqlValue::Blob(id.as_bytes().to_vec()));
        assert_eq!(Uuid::from_sql_value(value, "ID").unwrap(), id);
    }

    #[test]
    fn test_null_decodes_to_default_for_plain_types() {
        assert_eq!(String::from_sql_value(SqlValue::Null, "c").unwrap(), "");
        assert_eq!(i64::from_sql_value(SqlValue::Null, "c").unwrap(), 0);
        assert!(!bool::from_sql_value(SqlValue::Null, "c").unwrap());
        assert_eq!(Uuid::from_sql_value(SqlValue::Null, "c").unwrap(), Uuid::nil());
        assert_eq!(
            Duration::from_sql_value(SqlValue::Null, "c").unwrap(),
            Duration::zero()
        );
    }

    #[test]
    fn test_null_timestamp_decodes_to_tick_zero() {
        let value = DateTime::<Utc>::from_sql_value(SqlValue::Null, "Created").unwrap();
        assert_eq!(value.to_rfc3339(), "0001-01-01T00:00:00+00:00");
        assert_eq!(value.to_sql_value(), SqlValue::Int(0));
    }

    #[test]
    fn test_null_decodes_to_none_for_options() {
        assert_eq!(
            Option::<String>::from_sql_value(SqlValue::Null, "c").unwrap(),
            None
        );
        assert_eq!(
            Option::<i64>::from_sql_value(SqlValue::Int(7), "c").unwrap(),
            Some(7)
        );
    }

    #[test]
    fn test_bool_reads_integer_storage() {
        assert!(bool::from_sql_value(SqlValue::Int(1), "c").unwrap());
        assert!(!bool::from_sql_value(SqlValue::Int(0), "c").unwrap());
    }

    #[test]
    fn test_decode_mismatch_names_column() {
        let err = i64::from_sql_value(SqlValue::Text("x".into()), "ClassId").unwrap_err();
        assert_eq!(
            err,
            CoreError::Decode {
                column: "ClassId",
                expected: "i64",
                found: "TEXT",
            }
        );
    }

    #[test]
    fn test_i32_range_check() {
        assert!(i32::from_sql_value(SqlValue::Int(i64::MAX), "c").is_err());
        assert_eq!(i32::from_sql_value(SqlValue::Int(-3), "c").unwrap(), -3);
    }
}
