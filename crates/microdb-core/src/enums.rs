//! Enums persisted as integers.

/// Declares a fieldless enum stored as an INTEGER column.
///
/// The first variant is the `Default`, which is also what a NULL decodes
/// to. Unknown integers fail to decode.
///
/// ```
/// microdb_core::sql_enum! {
///     /// Access level.
///     pub enum Level {
///         Read = 1,
///         Write = 2,
///     }
/// }
///
/// use microdb_core::{FromSqlValue, SqlValue, ToSqlValue};
/// assert_eq!(Level::Write.to_sql_value(), SqlValue::Int(2));
/// assert_eq!(Level::from_sql_value(SqlValue::Int(1), "Level").unwrap(), Level::Read);
/// assert_eq!(Level::default(), Level::Read);
/// ```
#[macro_export]
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(#[$first_meta:meta])*
            $first:ident = $first_value:literal
            $(, $(#[$variant_meta:meta])* $variant:ident = $value:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis enum $name {
            $(#[$first_meta])*
            #[default]
            $first = $first_value,
            $($(#[$variant_meta])* $variant = $value,)*
        }

        impl $name {
            /// The stored integer.
            #[must_use]
            pub const fn as_i64(self) -> i64 {
                self as i64
            }

            /// Looks up a variant by its stored integer.
            #[must_use]
            pub const fn from_i64(value: i64) -> ::core::option::Option<Self> {
                match value {
                    $first_value => ::core::option::Option::Some(Self::$first),
                    $($value => ::core::option::Option::Some(Self::$variant),)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl $crate::ToSqlValue for $name {
            fn to_sql_value(self) -> $crate::SqlValue {
                $crate::SqlValue::Int(self.as_i64())
            }
        }

        impl $crate::FromSqlValue for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn from_sql_value(
                value: $crate::SqlValue,
                column: &'static str,
            ) -> $crate::error::Result<Self> {
                match value {
                    $crate::SqlValue::Null => ::core::result::Result::Ok(Self::default()),
                    $crate::SqlValue::Int(i) => Self::from_i64(i).ok_or($crate::CoreError::Decode {
                        column,
                        expected: stringify!($name),
                        found: "unknown INTEGER",
                    }),
                    other => ::core::result::Result::Err($crate::CoreError::Decode {
                        column,
                        expected: stringify!($name),
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}
