//! The condition algebra.
//!
//! Conditions are built from typed columns through [`ColumnExt`] and
//! combined with `&`, `|`, `^` and `!`. [`Condition::build`] compiles a
//! tree into a WHERE clause with positional `?` placeholders, after
//! checking that every referenced column belongs to the queried table.
//!
//! ```
//! use microdb_core::{ColumnExt, Condition};
//! # use microdb_core::{Column, Inserter, SqlValue, Table};
//! # #[derive(Clone, Copy)] struct Name;
//! # struct Pairs;
//! # #[derive(Default)] struct W;
//! # impl Inserter for W {
//! #     fn changed_columns(&self) -> Vec<&'static str> { vec![] }
//! #     fn into_assignments(self) -> Vec<(&'static str, SqlValue)> { vec![] }
//! # }
//! # impl Table for Pairs {
//! #     type Row = (); type Inserter = W;
//! #     const NAME: &'static str = "Pairs";
//! #     const COLUMNS: &'static [&'static str] = &["Name"];
//! #     const PRIMARY_KEY: Option<&'static str> = Some("Name");
//! #     fn decode_row(_: Vec<SqlValue>) -> microdb_core::error::Result<()> { Ok(()) }
//! # }
//! # impl Column for Name {
//! #     type Table = Pairs; type Type = String;
//! #     const NAME: &'static str = "Name";
//! #     const NULLABLE: bool = false; const PRIMARY_KEY: bool = true;
//! # }
//! let cond = Name.eq("theme") | Name.like("ui.%");
//! let clause = cond.build(Pairs::table_id()).unwrap();
//! assert_eq!(clause.sql, r#" where (("Name" = ?) OR ("Name" LIKE ?))"#);
//! assert_eq!(clause.params.len(), 2);
//! ```

use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::error::Result;
use crate::schema::{Column, ColumnRef, TableId};
use crate::statement::quote_ident;
use crate::value::{SqlValue, ToSqlValue};

/// Comparison operators for leaf conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    /// Returns the SQL operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Boolean operators used to combine conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolOp {
    /// Both sides hold.
    #[default]
    And,
    /// Either side holds.
    Or,
    /// Exactly one side holds.
    Xor,
}

/// A WHERE-clause expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column OP ?`
    Compare {
        /// Compared column.
        column: ColumnRef,
        /// Operator.
        op: CompareOp,
        /// Bound value.
        value: SqlValue,
    },
    /// `column LIKE ?` or `column NOT LIKE ?`
    Like {
        /// Matched column.
        column: ColumnRef,
        /// Pattern bound as a parameter.
        pattern: String,
        /// Renders `NOT LIKE` when set.
        negated: bool,
    },
    /// `column IN (?, ...)` or `column NOT IN (?, ...)`
    InList {
        /// Tested column.
        column: ColumnRef,
        /// Candidate values.
        values: Vec<SqlValue>,
        /// Renders `NOT IN` when set.
        negated: bool,
    },
    /// `column IS NULL` or `column IS NOT NULL`
    IsNull {
        /// Tested column.
        column: ColumnRef,
        /// Renders `IS NOT NULL` when set.
        negated: bool,
    },
    /// Two conditions joined by a boolean operator.
    Binary {
        /// Left operand.
        lhs: Box<Condition>,
        /// Operator.
        op: BoolOp,
        /// Right operand.
        rhs: Box<Condition>,
    },
    /// Negation.
    Not(Box<Condition>),
    /// Constant truth value (`1 = 1` or `0 = 1`).
    Literal(bool),
}

/// A compiled WHERE clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    /// Clause text, starting with `" where "`. Empty when there is no
    /// condition.
    pub sql: String,
    /// One value per placeholder, left to right.
    pub params: Vec<SqlValue>,
}

impl Condition {
    /// Joins two conditions with AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(BoolOp::And, other)
    }

    /// Joins two conditions with OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(BoolOp::Or, other)
    }

    /// Joins two conditions with XOR.
    #[must_use]
    pub fn xor(self, other: Self) -> Self {
        self.combine(BoolOp::Xor, other)
    }

    /// Negates this condition.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Joins two conditions with `op`.
    #[must_use]
    pub fn combine(self, op: BoolOp, other: Self) -> Self {
        Self::Binary {
            lhs: Box::new(self),
            op,
            rhs: Box::new(other),
        }
    }

    /// Folds conditions left to right with `op`.
    ///
    /// An empty input yields the always-true `1 = 1`.
    #[must_use]
    pub fn condense(conditions: impl IntoIterator<Item = Self>, op: BoolOp) -> Self {
        conditions
            .into_iter()
            .reduce(|acc, next| acc.combine(op, next))
            .unwrap_or(Self::Literal(true))
    }

    /// Every column referenced by the tree, left to right.
    #[must_use]
    pub fn entities(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        self.collect_entities(&mut out);
        out
    }

    fn collect_entities(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Self::Compare { column, .. }
            | Self::Like { column, .. }
            | Self::InList { column, .. }
            | Self::IsNull { column, .. } => out.push(*column),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_entities(out);
                rhs.collect_entities(out);
            }
            Self::Not(inner) => inner.collect_entities(out),
            Self::Literal(_) => {}
        }
    }

    /// Compiles this condition against `table`.
    ///
    /// All entities are validated before any text is produced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidWhereClause`] if a column belongs
    /// to another table.
    pub fn build(&self, table: TableId) -> Result<WhereClause> {
        for column in self.entities() {
            column.check_owner(table)?;
        }
        let mut expr = String::new();
        let mut params = Vec::new();
        self.render(&mut expr, &mut params);
        Ok(WhereClause {
            sql: format!(" where ({expr})"),
            params,
        })
    }

    /// Compiles an optional condition; `None` produces an empty clause.
    ///
    /// # Errors
    ///
    /// See [`Condition::build`].
    pub fn build_optional(condition: Option<&Self>, table: TableId) -> Result<WhereClause> {
        condition.map_or_else(|| Ok(WhereClause::default()), |c| c.build(table))
    }

    fn render(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Self::Compare { column, op, value } => {
                sql.push_str(&format!("{} {} ?", quote_ident(column.name), op.as_sql()));
                params.push(value.clone());
            }
            Self::Like {
                column,
                pattern,
                negated,
            } => {
                let op = if *negated { "NOT LIKE" } else { "LIKE" };
                sql.push_str(&format!("{} {op} ?", quote_ident(column.name)));
                params.push(SqlValue::Text(pattern.clone()));
            }
            Self::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    sql.push_str(if *negated { "1 = 1" } else { "0 = 1" });
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                sql.push_str(&format!(
                    "{} {op} ({placeholders})",
                    quote_ident(column.name)
                ));
                params.extend(values.iter().cloned());
            }
            Self::IsNull { column, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{} {op}", quote_ident(column.name)));
            }
            Self::Binary { lhs, op, rhs } => match op {
                BoolOp::And | BoolOp::Or => {
                    let word = if *op == BoolOp::And { "AND" } else { "OR" };
                    sql.push('(');
                    lhs.render(sql, params);
                    sql.push_str(&format!(") {word} ("));
                    rhs.render(sql, params);
                    sql.push(')');
                }
                BoolOp::Xor => {
                    // SQLite has no logical XOR; both operands render twice.
                    sql.push_str("((");
                    lhs.render(sql, params);
                    sql.push_str(") OR (");
                    rhs.render(sql, params);
                    sql.push_str(")) AND NOT ((");
                    lhs.render(sql, params);
                    sql.push_str(") AND (");
                    rhs.render(sql, params);
                    sql.push_str("))");
                }
            },
            Self::Not(inner) => {
                sql.push_str("NOT (");
                inner.render(sql, params);
                sql.push(')');
            }
            Self::Literal(true) => sql.push_str("1 = 1"),
            Self::Literal(false) => sql.push_str("0 = 1"),
        }
    }
}

impl BitAnd for Condition {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.and(rhs)
    }
}

impl BitOr for Condition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.or(rhs)
    }
}

impl BitXor for Condition {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self.xor(rhs)
    }
}

impl Not for Condition {
    type Output = Self;

    fn not(self) -> Self {
        self.negate()
    }
}

/// Condition constructors available on every typed column.
///
/// Values must convert into the column's declared type, so comparing a
/// text column with an integer does not compile.
pub trait ColumnExt: Column
where
    Self::Type: ToSqlValue,
{
    /// Creates a comparison with an explicit operator.
    fn compare(self, op: CompareOp, value: impl Into<Self::Type>) -> Condition {
        Condition::Compare {
            column: self.column_ref(),
            op,
            value: value.into().to_sql_value(),
        }
    }

    /// `column = value`
    fn eq(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::Eq, value)
    }

    /// `column != value`
    fn not_eq(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::NotEq, value)
    }

    /// `column < value`
    fn lt(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::Lt, value)
    }

    /// `column <= value`
    fn lt_eq(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::LtEq, value)
    }

    /// `column > value`
    fn gt(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::Gt, value)
    }

    /// `column >= value`
    fn gt_eq(self, value: impl Into<Self::Type>) -> Condition {
        self.compare(CompareOp::GtEq, value)
    }

    /// `column LIKE pattern`
    fn like(self, pattern: impl Into<String>) -> Condition {
        Condition::Like {
            column: self.column_ref(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    /// `column NOT LIKE pattern`
    fn not_like(self, pattern: impl Into<String>) -> Condition {
        Condition::Like {
            column: self.column_ref(),
            pattern: pattern.into(),
            negated: true,
        }
    }

    /// `column IN (values...)`
    fn in_list<V: Into<Self::Type>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::InList {
            column: self.column_ref(),
            values: values
                .into_iter()
                .map(|v| v.into().to_sql_value())
                .collect(),
            negated: false,
        }
    }

    /// `column NOT IN (values...)`
    fn not_in_list<V: Into<Self::Type>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::InList {
            column: self.column_ref(),
            values: values
                .into_iter()
                .map(|v| v.into().to_sql_value())
                .collect(),
            negated: true,
        }
    }

    /// `column IS NULL`
    fn is_null(self) -> Condition {
        Condition::IsNull {
            column: self.column_ref(),
            negated: false,
        }
    }

    /// `column IS NOT NULL`
    fn is_not_null(self) -> Condition {
        Condition::IsNull {
            column: self.column_ref(),
            negated: true,
        }
    }
}

impl<C> ColumnExt for C
where
    C: Column,
    C::Type: ToSqlValue,
{
}
