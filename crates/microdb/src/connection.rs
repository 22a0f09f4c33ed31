//! A single exclusive connection to one database file.
//!
//! Every statement, and every transaction as a whole, runs while holding
//! the connection lock. Waiting for the lock is bounded by the lock
//! timeout; statements are bounded by the soft and hard timeouts. When a
//! statement exceeds the hard timeout the connection is dropped and every
//! later operation fails with [`Error::ConnectionClosed`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use futures::future::BoxFuture;
use microdb_core::{SqlValue, Statement, Table};
use sqlx::{Connection as _, Executor as _, SqliteConnection};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::bind::{prepare, row_values};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::table::TableHandle;
use crate::transaction::Transaction;
use crate::watchdog::{watch, Watched};

const NOTIFY_CAPACITY: usize = 64;

/// Emitted after a write outside a transaction, or after a commit that
/// wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseWritten {
    /// The database file that was written.
    pub path: PathBuf,
}

pub(crate) struct State {
    conn: Option<SqliteConnection>,
    pending_rollback: bool,
}

pub(crate) struct Shared {
    path: PathBuf,
    config: ConnectorConfig,
    state: Arc<Mutex<State>>,
    poisoned: AtomicBool,
    closed: AtomicBool,
    written: broadcast::Sender<DatabaseWritten>,
}

impl Shared {
    pub(crate) const fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub(crate) fn closed(&self) -> Error {
        Error::ConnectionClosed {
            path: self.path.clone(),
        }
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    pub(crate) fn poison(&self, elapsed: Duration) -> Error {
        self.poisoned.store(true, Ordering::SeqCst);
        error!(
            path = %self.path.display(),
            elapsed = ?elapsed,
            "Statement exceeded hard timeout, closing connection"
        );
        Error::HardTimeout {
            path: self.path.clone(),
            elapsed,
        }
    }

    pub(crate) fn notify_written(&self) {
        // No subscribers is not an error.
        let _ = self.written.send(DatabaseWritten {
            path: self.path.clone(),
        });
    }
}

/// A handle to an open database.
///
/// Cloning is cheap; clones share the same underlying connection and lock.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.shared.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(path: PathBuf, config: ConnectorConfig, conn: SqliteConnection) -> Self {
        let (written, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                path,
                config,
                state: Arc::new(Mutex::new(State {
                    conn: Some(conn),
                    pending_rollback: false,
                })),
                poisoned: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                written,
            }),
        }
    }

    /// The database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// The timeouts in effect.
    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.shared.config
    }

    /// Returns true once the connection was closed or abandoned.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_poisoned() || self.shared.closed.load(Ordering::SeqCst)
    }

    /// Subscribes to write notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DatabaseWritten> {
        self.shared.written.subscribe()
    }

    /// Returns a handle for running typed statements against `T`.
    #[must_use]
    pub fn table<T: Table>(&self) -> TableHandle<'_, T> {
        TableHandle::on_connection(self)
    }

    /// Starts a transaction. The connection lock is held until it is
    /// committed, rolled back or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] when the lock is not acquired in time.
    pub async fn begin(&self) -> Result<Transaction> {
        Transaction::begin(self.clone()).await
    }

    /// Runs `work` inside a new transaction.
    ///
    /// `work` commits explicitly. If it fails, the transaction is rolled
    /// back and the error returned; if it returns without finishing the
    /// transaction, the transaction is rolled back.
    ///
    /// ```ignore
    /// conn.call_on_transaction(|tx| Box::pin(async move {
    ///     tx.table::<PairsTable>().insert(|w| { w.name("a").value("1"); }).await?;
    ///     tx.commit().await
    /// }))
    /// .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a lock/driver error.
    pub async fn call_on_transaction<R, F>(&self, work: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, Result<R>>,
    {
        let mut tx = self.begin().await?;
        match work(&mut tx).await {
            Ok(value) => {
                if !tx.is_finished() {
                    warn!(path = %self.path().display(), "Transaction left open, rolling back");
                    tx.rollback().await?;
                }
                Ok(value)
            }
            Err(e) => {
                if !tx.is_finished() {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "Rollback after failure also failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Reads the schema version stored in the file.
    ///
    /// # Errors
    ///
    /// Returns a lock or driver error.
    pub async fn user_version(&self) -> Result<i64> {
        let mut held = self.acquire().await?;
        held.user_version().await
    }

    pub(crate) async fn is_blank(&self) -> Result<bool> {
        let mut held = self.acquire().await?;
        held.is_blank().await
    }

    /// Compacts the database file.
    ///
    /// # Errors
    ///
    /// Returns a lock or driver error.
    pub async fn vacuum(&self) -> Result<()> {
        let mut held = self.acquire().await?;
        held.execute_sql("VACUUM").await?;
        info!(path = %self.path().display(), "Vacuumed database");
        Ok(())
    }

    /// Last modification time of the database file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file metadata cannot be read.
    pub async fn last_modified(&self) -> Result<SystemTime> {
        Ok(tokio::fs::metadata(self.path()).await?.modified()?)
    }

    /// Closes the connection. Later operations fail with
    /// [`Error::ConnectionClosed`]. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] when the lock is not acquired in time.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.lock_state().await?;
        self.shared.closed.store(true, Ordering::SeqCst);
        if self.shared.is_poisoned() {
            state.conn = None;
        } else if let Some(conn) = state.conn.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Error while closing connection");
            }
            info!(path = %self.path().display(), "Closed database");
        }
        Ok(())
    }

    pub(crate) fn notify_written(&self) {
        self.shared.notify_written();
    }

    async fn lock_state(&self) -> Result<OwnedMutexGuard<State>> {
        let waited = self.shared.config.lock_timeout;
        timeout(waited, Arc::clone(&self.shared.state).lock_owned())
            .await
            .map_err(|_| {
                warn!(path = %self.path().display(), waited = ?waited, "Timed out waiting for connection lock");
                Error::LockTimeout {
                    path: self.shared.path.clone(),
                    waited,
                }
            })
    }

    /// Takes the connection lock for one statement or one transaction.
    pub(crate) async fn acquire(&self) -> Result<Held> {
        if self.shared.is_poisoned() {
            if let Ok(mut state) = self.shared.state.try_lock() {
                state.conn = None;
            }
            return Err(self.shared.closed());
        }

        let guard = self.lock_state().await?;
        if guard.conn.is_none() {
            return Err(self.shared.closed());
        }
        let mut held = Held {
            guard,
            shared: Arc::clone(&self.shared),
            acquired: Instant::now(),
        };
        if held.guard.pending_rollback {
            held.guard.pending_rollback = false;
            debug!("Rolling back transaction abandoned by its owner");
            if let Err(e) = held.execute_sql("ROLLBACK").await {
                if matches!(e, Error::HardTimeout { .. }) {
                    return Err(e);
                }
                warn!(error = %e, "Deferred rollback failed");
            }
        }
        Ok(held)
    }
}

/// Exclusive access to the connection.
///
/// Released on drop. Holding it past the soft timeout logs a warning.
pub(crate) struct Held {
    guard: OwnedMutexGuard<State>,
    shared: Arc<Shared>,
    acquired: Instant,
}

impl Held {
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// The live driver connection.
    pub(crate) fn conn(&mut self) -> Result<&mut SqliteConnection> {
        if self.shared.is_poisoned() {
            self.guard.conn = None;
        }
        self.guard.conn.as_mut().ok_or_else(|| self.shared.closed())
    }

    /// Makes the next lock holder roll back before doing anything else.
    pub(crate) fn defer_rollback(&mut self) {
        self.guard.pending_rollback = true;
    }

    /// Drops the driver connection after a hard timeout.
    pub(crate) fn abandon(&mut self, elapsed: Duration) -> Error {
        self.guard.conn = None;
        self.shared.poison(elapsed)
    }

    /// Runs literal SQL with no parameters.
    pub(crate) fn execute_sql<'s>(&'s mut self, sql: &'s str) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            debug!(sql = %sql, "Executing SQL");
            let config = *self.shared.config();
            let conn = self.conn()?;
            match watch(&config, sql, conn.execute(sqlx::raw_sql(sql))).await {
                Watched::Done(result) => result.map(|_| ()).map_err(|e| Error::query(sql, e)),
                Watched::Abandoned(elapsed) => Err(self.abandon(elapsed)),
            }
        })
    }

    /// Runs a statement, returning the number of affected rows.
    pub(crate) fn execute(&mut self, statement: Statement) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            debug!(sql = %statement.sql, "Executing SQL");
            let config = *self.shared.config();
            let Statement { sql, params } = statement;
            let conn = self.conn()?;
            match watch(&config, &sql, conn.execute(prepare(&sql, params))).await {
                Watched::Done(result) => result
                    .map(|done| done.rows_affected())
                    .map_err(|e| Error::query(&sql, e)),
                Watched::Abandoned(elapsed) => Err(self.abandon(elapsed)),
            }
        })
    }

    /// Runs a query returning at most one row, yielding its first column.
    pub(crate) fn fetch_scalar(&mut self, statement: Statement) -> BoxFuture<'_, Result<SqlValue>> {
        Box::pin(async move {
            debug!(sql = %statement.sql, "Executing SQL");
            let config = *self.shared.config();
            let Statement { sql, params } = statement;
            let conn = self.conn()?;
            match watch(&config, &sql, conn.fetch_optional(prepare(&sql, params))).await {
                Watched::Done(Ok(Some(row))) => Ok(row_values(&row)
                    .map_err(|e| Error::query(&sql, e))?
                    .into_iter()
                    .next()
                    .unwrap_or(SqlValue::Null)),
                Watched::Done(Ok(None)) => Ok(SqlValue::Null),
                Watched::Done(Err(e)) => Err(Error::query(&sql, e)),
                Watched::Abandoned(elapsed) => Err(self.abandon(elapsed)),
            }
        })
    }

    pub(crate) fn user_version(&mut self) -> BoxFuture<'_, Result<i64>> {
        Box::pin(async move {
            let value = self
                .fetch_scalar(Statement {
                    sql: "PRAGMA user_version".to_string(),
                    params: Vec::new(),
                })
                .await?;
            Ok(match value {
                SqlValue::Int(v) => v,
                _ => 0,
            })
        })
    }

    /// Returns true when the file holds no tables yet.
    pub(crate) fn is_blank(&mut self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let tables = self
                .fetch_scalar(Statement {
                    sql: "SELECT count(*) FROM sqlite_master WHERE type = 'table'".to_string(),
                    params: Vec::new(),
                })
                .await?;
            Ok(matches!(tables, SqlValue::Int(0)))
        })
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        let held = self.acquired.elapsed();
        if held > self.shared.config.soft_timeout {
            warn!(
                path = %self.shared.path.display(),
                held = ?held,
                "Connection lock held longer than soft timeout"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection as _;

    async fn memory() -> Connection {
        let conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        Connection::new(PathBuf::from(":memory:"), ConnectorConfig::default(), conn)
    }

    #[tokio::test]
    async fn test_closed_while_lock_is_held_elsewhere() {
        let conn = memory().await;
        assert!(!conn.is_closed());
        conn.close().await.unwrap();

        let _guard = conn.shared.state.lock().await;
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_open_while_lock_is_held_elsewhere() {
        let conn = memory().await;
        let _held = conn.acquire().await.unwrap();
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_blank_and_stamped_files() {
        let conn = memory().await;
        assert!(conn.is_blank().await.unwrap());
        assert_eq!(conn.user_version().await.unwrap(), 0);

        let mut held = conn.acquire().await.unwrap();
        held.execute_sql("CREATE TABLE \"T\" (\"A\" INTEGER); PRAGMA user_version = 4")
            .await
            .unwrap();
        drop(held);
        assert!(!conn.is_blank().await.unwrap());
        assert_eq!(conn.user_version().await.unwrap(), 4);
    }
}
