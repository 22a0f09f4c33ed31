//! Typed statements against one table.

use std::marker::PhantomData;

use futures::future::BoxFuture;
use futures::TryStreamExt;
use microdb_core::statement::{self, LAST_INSERT_ROWID};
use microdb_core::{Condition, FromSqlValue, Query, SqlValue, Statement, Table};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::stream::{self, RowStream};
use crate::transaction::Transaction;

enum Target<'a> {
    Connection(&'a Connection),
    Transaction(&'a mut Transaction),
}

/// Typed access to table `T`, either directly on a connection (each
/// statement takes the connection lock on its own) or inside a
/// transaction.
///
/// ```ignore
/// let mut pairs = conn.table::<PairsTable>();
/// pairs.insert(|w| { w.name("theme").value("dark"); }).await?;
/// let theme = pairs.select_single(Some(PairsTable::name().eq("theme"))).await?;
/// ```
pub struct TableHandle<'a, T: Table> {
    target: Target<'a>,
    _table: PhantomData<fn() -> T>,
}

impl<'a, T: Table> TableHandle<'a, T> {
    pub(crate) const fn on_connection(connection: &'a Connection) -> Self {
        Self {
            target: Target::Connection(connection),
            _table: PhantomData,
        }
    }

    pub(crate) fn on_transaction(transaction: &'a mut Transaction) -> Self {
        Self {
            target: Target::Transaction(transaction),
            _table: PhantomData,
        }
    }

    fn reborrow(&mut self) -> TableHandle<'_, T> {
        let target = match &mut self.target {
            Target::Connection(connection) => Target::Connection(*connection),
            Target::Transaction(transaction) => Target::Transaction(&mut **transaction),
        };
        TableHandle {
            target,
            _table: PhantomData,
        }
    }

    /// Streams the rows matching `query`.
    ///
    /// # Errors
    ///
    /// Fails before producing a stream when the query references a
    /// foreign column or the lock cannot be taken. Driver and decoding
    /// errors surface as stream items.
    pub fn select(self, query: Query) -> BoxFuture<'a, Result<RowStream<'a, T::Row>>> {
        Box::pin(async move {
            let statement = statement::select::<T>(&query)?;
            match self.target {
                Target::Connection(connection) => {
                    let held = connection.acquire().await?;
                    debug!(sql = %statement.sql, "Executing SQL");
                    Ok(stream::spawned::<T>(held, statement))
                }
                Target::Transaction(transaction) => transaction.stream::<T>(statement),
            }
        })
    }

    /// Reads every row of the table.
    ///
    /// # Errors
    ///
    /// See [`TableHandle::select`].
    pub fn select_all(&mut self) -> BoxFuture<'_, Result<Vec<T::Row>>> {
        self.select_vec(Query::all())
    }

    /// Reads the rows matching `query` into a vector.
    ///
    /// # Errors
    ///
    /// See [`TableHandle::select`].
    pub fn select_vec(&mut self, query: Query) -> BoxFuture<'_, Result<Vec<T::Row>>> {
        Box::pin(async move { self.reborrow().select(query).await?.try_collect().await })
    }

    /// Reads the single row matching `condition`.
    ///
    /// Returns `None` when no row matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when more than one row matches.
    pub fn select_single(&mut self, condition: Option<Condition>) -> BoxFuture<'_, Result<Option<T::Row>>> {
        let query = Query::all().with_condition(condition).max(2);
        Box::pin(async move {
            let mut rows = self.select_vec(query).await?;
            if rows.len() > 1 {
                return Err(Error::Query {
                    message: format!("more than one object returned from {}", T::NAME),
                    source: None,
                });
            }
            Ok(rows.pop())
        })
    }

    /// Counts the rows matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns a statement, lock or driver error.
    pub fn count(&mut self, condition: Option<Condition>) -> BoxFuture<'_, Result<i64>> {
        let statement = statement::count::<T>(condition.as_ref());
        Box::pin(async move {
            let value = self.scalar(statement?).await?;
            Ok(i64::from_sql_value(value, "COUNT(*)")?)
        })
    }

    /// Inserts one row with the columns assigned by `fill`.
    ///
    /// # Errors
    ///
    /// Returns a lock or driver error, such as a constraint violation.
    pub fn insert(&mut self, fill: impl FnOnce(&mut T::Inserter)) -> BoxFuture<'_, Result<()>> {
        let statement = statement::insert::<T>(writer::<T>(fill));
        Box::pin(async move { self.write(statement).await.map(|_| ()) })
    }

    /// Inserts one row and returns the generated primary key.
    ///
    /// # Errors
    ///
    /// Returns a lock or driver error, or a decoding error when the key
    /// does not fit `K`.
    pub fn insert_and_return_primary_key<K: FromSqlValue>(
        &mut self,
        fill: impl FnOnce(&mut T::Inserter),
    ) -> BoxFuture<'_, Result<K>> {
        let insert = statement::insert::<T>(writer::<T>(fill));
        let rowid = Statement {
            sql: LAST_INSERT_ROWID.to_string(),
            params: Vec::new(),
        };
        let column = T::PRIMARY_KEY.unwrap_or("rowid");
        Box::pin(async move {
            let value = match &mut self.target {
                Target::Connection(connection) => {
                    let mut held = connection.acquire().await?;
                    held.execute(insert).await?;
                    let value = held.fetch_scalar(rowid).await?;
                    drop(held);
                    connection.notify_written();
                    value
                }
                Target::Transaction(transaction) => {
                    transaction.execute(insert).await?;
                    transaction.fetch_scalar(rowid).await?
                }
            };
            Ok(K::from_sql_value(value, column)?)
        })
    }

    /// Updates the rows matching `condition` with the columns assigned by
    /// `fill`, returning how many rows changed.
    ///
    /// # Errors
    ///
    /// Returns a statement error (including an empty update), or a lock or
    /// driver error.
    pub fn update(
        &mut self,
        condition: Option<Condition>,
        fill: impl FnOnce(&mut T::Inserter),
    ) -> BoxFuture<'_, Result<u64>> {
        let statement = statement::update::<T>(writer::<T>(fill), condition.as_ref());
        Box::pin(async move { self.write(statement?).await })
    }

    /// Deletes the rows matching `condition`, returning how many were
    /// removed. `None` deletes every row.
    ///
    /// # Errors
    ///
    /// Returns a statement, lock or driver error.
    pub fn delete(&mut self, condition: Option<Condition>) -> BoxFuture<'_, Result<u64>> {
        let statement = statement::delete::<T>(condition.as_ref());
        Box::pin(async move { self.write(statement?).await })
    }

    fn write(&mut self, statement: Statement) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            match &mut self.target {
                Target::Connection(connection) => {
                    let mut held = connection.acquire().await?;
                    let affected = held.execute(statement).await?;
                    drop(held);
                    connection.notify_written();
                    Ok(affected)
                }
                Target::Transaction(transaction) => transaction.execute(statement).await,
            }
        })
    }

    fn scalar(&mut self, statement: Statement) -> BoxFuture<'_, Result<SqlValue>> {
        Box::pin(async move {
            match &mut self.target {
                Target::Connection(connection) => {
                    connection.acquire().await?.fetch_scalar(statement).await
                }
                Target::Transaction(transaction) => transaction.fetch_scalar(statement).await,
            }
        })
    }
}

fn writer<T: Table>(fill: impl FnOnce(&mut T::Inserter)) -> T::Inserter {
    let mut inserter = T::Inserter::default();
    fill(&mut inserter);
    inserter
}
