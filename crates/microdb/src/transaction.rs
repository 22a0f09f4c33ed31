//! Explicit transactions.

use microdb_core::{Statement, Table};
use tracing::{debug, warn};

use crate::connection::{Connection, Held};
use crate::error::{Error, Result};
use crate::stream::{self, RowStream};
use crate::table::TableHandle;

/// A transaction holding the connection lock.
///
/// Finish it with [`Transaction::commit`] or [`Transaction::rollback`];
/// any later use fails with [`Error::TransactionFinished`]. Dropping an
/// unfinished transaction rolls it back before the next statement runs.
pub struct Transaction {
    held: Held,
    connection: Connection,
    finished: bool,
    dirty: bool,
    /// SQL text of the SELECT currently streamed through this transaction.
    streaming_sql: String,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("path", &self.connection.path())
            .field("finished", &self.finished)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) async fn begin(connection: Connection) -> Result<Self> {
        let mut held = connection.acquire().await?;
        held.execute_sql("BEGIN").await?;
        debug!(path = %connection.path().display(), "Transaction started");
        Ok(Self {
            held,
            connection,
            finished: false,
            dirty: false,
            streaming_sql: String::new(),
        })
    }

    /// The connection this transaction runs on.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns true once committed or rolled back.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns a handle for running typed statements against `T` inside
    /// this transaction.
    #[must_use]
    pub fn table<T: Table>(&mut self) -> TableHandle<'_, T> {
        TableHandle::on_transaction(self)
    }

    /// Commits. Emits a write notification when anything was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionFinished`] if already finished, or the
    /// driver error when COMMIT fails (the transaction is then rolled back
    /// before the next statement).
    pub async fn commit(&mut self) -> Result<()> {
        self.finish()?;
        if let Err(e) = self.held.execute_sql("COMMIT").await {
            self.held.defer_rollback();
            return Err(e);
        }
        debug!(path = %self.connection.path().display(), "Transaction committed");
        if self.dirty {
            self.connection.notify_written();
        }
        Ok(())
    }

    /// Rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionFinished`] if already finished, or the
    /// driver error.
    pub async fn rollback(&mut self) -> Result<()> {
        self.finish()?;
        self.held.execute_sql("ROLLBACK").await?;
        debug!(path = %self.connection.path().display(), "Transaction rolled back");
        Ok(())
    }

    /// Runs literal SQL, such as DDL, inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver error, or [`Error::TransactionFinished`].
    pub async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.active()?.execute_sql(sql).await?;
        self.dirty = true;
        Ok(())
    }

    /// Reads the schema version stored in the file.
    ///
    /// # Errors
    ///
    /// Returns the driver error, or [`Error::TransactionFinished`].
    pub async fn user_version(&mut self) -> Result<i64> {
        self.active()?.user_version().await
    }

    /// Stamps the schema version stored in the file.
    pub(crate) async fn set_user_version(&mut self, version: i64) -> Result<()> {
        self.execute_batch(&format!("PRAGMA user_version = {version}")).await
    }

    pub(crate) async fn execute(&mut self, statement: Statement) -> Result<u64> {
        let affected = self.active()?.execute(statement).await?;
        self.dirty = true;
        Ok(affected)
    }

    pub(crate) async fn fetch_scalar(&mut self, statement: Statement) -> Result<microdb_core::SqlValue> {
        self.active()?.fetch_scalar(statement).await
    }

    pub(crate) fn stream<T: Table>(&mut self, statement: Statement) -> Result<RowStream<'_, T::Row>> {
        if self.finished {
            return Err(Error::TransactionFinished);
        }
        let Statement { sql, params } = statement;
        debug!(sql = %sql, "Executing SQL");
        self.streaming_sql = sql;
        stream::borrowed::<T>(&mut self.held, &self.streaming_sql, params)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::TransactionFinished);
        }
        self.finished = true;
        Ok(())
    }

    fn active(&mut self) -> Result<&mut Held> {
        if self.finished {
            Err(Error::TransactionFinished)
        } else {
            Ok(&mut self.held)
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                path = %self.connection.path().display(),
                "Transaction dropped without commit or rollback"
            );
            self.held.defer_rollback();
        }
    }
}
