//! SQL statement builders for typed tables.
//!
//! Builders only produce text and parameters; they never talk to a
//! database. Every builder validates conditions and orderings against the
//! target table before emitting anything.

use crate::condition::{Condition, WhereClause};
use crate::error::{CoreError, Result};
use crate::schema::{Column, ColumnRef, Inserter, Table, TableId};
use crate::value::SqlValue;

/// Quotes an identifier for SQLite.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl SortOrder {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// One value per `?`, left to right.
    pub params: Vec<SqlValue>,
}

impl Statement {
    fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }
}

/// Options for a SELECT.
///
/// ```ignore
/// let query = Query::filter(PairsTable::name().like("ui.%"))
///     .order_by(PairsTable::name())
///     .sort(SortOrder::Desc)
///     .max(10);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Row filter; `None` matches every row.
    pub condition: Option<Condition>,
    /// Row limit.
    pub max: Option<u64>,
    /// Direction applied to all ordering columns.
    pub sort: SortOrder,
    /// Ordering columns.
    pub order_by: Vec<ColumnRef>,
}

impl Query {
    /// A query matching every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A query matching rows that satisfy `condition`.
    #[must_use]
    pub fn filter(condition: Condition) -> Self {
        Self {
            condition: Some(condition),
            ..Self::default()
        }
    }

    /// Replaces the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }

    /// Limits the number of rows.
    #[must_use]
    pub const fn max(mut self, max: u64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the sort direction.
    #[must_use]
    pub const fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Appends an ordering column.
    #[must_use]
    pub fn order_by(mut self, column: impl Column) -> Self {
        self.order_by.push(column.column_ref());
        self
    }
}

fn quoted_columns(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause<T: Table>(condition: Option<&Condition>) -> Result<WhereClause> {
    Condition::build_optional(condition, TableId::of::<T>())
}

/// Builds `SELECT <all columns> FROM <table>` with the query's options.
///
/// # Errors
///
/// Returns [`CoreError::InvalidWhereClause`] when the condition or an
/// ordering column belongs to another table.
pub fn select<T: Table>(query: &Query) -> Result<Statement> {
    let table = TableId::of::<T>();
    for column in &query.order_by {
        column.check_owner(table)?;
    }
    let clause = where_clause::<T>(query.condition.as_ref())?;

    let mut sql = format!(
        "SELECT {} FROM {}",
        quoted_columns(T::COLUMNS),
        quote_ident(T::NAME)
    );
    sql.push_str(&clause.sql);

    if !query.order_by.is_empty() {
        let names: Vec<&str> = query.order_by.iter().map(|c| c.name).collect();
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quoted_columns(&names),
            query.sort.as_sql()
        ));
    }

    if let Some(max) = query.max {
        sql.push_str(&format!(" LIMIT {max}"));
    }

    Ok(Statement::new(sql, clause.params))
}

/// Builds `SELECT COUNT(*) FROM <table>` with an optional condition.
///
/// # Errors
///
/// See [`select`].
pub fn count<T: Table>(condition: Option<&Condition>) -> Result<Statement> {
    let clause = where_clause::<T>(condition)?;
    Ok(Statement::new(
        format!("SELECT COUNT(*) FROM {}{}", quote_ident(T::NAME), clause.sql),
        clause.params,
    ))
}

/// Builds an INSERT of the writer's assigned columns.
///
/// Derived fields are applied first. A writer with nothing assigned
/// inserts a row of defaults.
#[must_use]
pub fn insert<T: Table>(mut inserter: T::Inserter) -> Statement {
    T::derive_fields(&mut inserter);
    let (columns, params): (Vec<&str>, Vec<SqlValue>) =
        inserter.into_assignments().into_iter().unzip();

    if columns.is_empty() {
        return Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(T::NAME)),
            params,
        );
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(T::NAME),
            quoted_columns(&columns)
        ),
        params,
    )
}

/// Builds an UPDATE whose SET clause lists only the assigned columns.
///
/// # Errors
///
/// Returns [`CoreError::EmptyUpdate`] when nothing was assigned and
/// [`CoreError::InvalidWhereClause`] for a foreign condition.
pub fn update<T: Table>(mut inserter: T::Inserter, condition: Option<&Condition>) -> Result<Statement> {
    T::derive_fields(&mut inserter);
    let clause = where_clause::<T>(condition)?;
    let assignments = inserter.into_assignments();
    if assignments.is_empty() {
        return Err(CoreError::EmptyUpdate { table: T::NAME });
    }

    let mut sets = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len() + clause.params.len());
    for (column, value) in assignments {
        sets.push(format!("{} = ?", quote_ident(column)));
        params.push(value);
    }
    params.extend(clause.params);

    Ok(Statement::new(
        format!(
            "UPDATE {} SET {}{}",
            quote_ident(T::NAME),
            sets.join(", "),
            clause.sql
        ),
        params,
    ))
}

/// Builds `DELETE FROM <table>` with an optional condition.
///
/// # Errors
///
/// Returns [`CoreError::InvalidWhereClause`] for a foreign condition.
pub fn delete<T: Table>(condition: Option<&Condition>) -> Result<Statement> {
    let clause = where_clause::<T>(condition)?;
    Ok(Statement::new(
        format!("DELETE FROM {}{}", quote_ident(T::NAME), clause.sql),
        clause.params,
    ))
}

/// The statement that reads the rowid generated by the last INSERT.
pub const LAST_INSERT_ROWID: &str = "SELECT last_insert_rowid()";
