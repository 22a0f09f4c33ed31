//! Error types for the engine.

use std::path::PathBuf;
use std::time::Duration;

use microdb_core::CoreError;

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database file could not be opened. Fatal; never retried here.
    #[error("cannot open database {path}: {reason}")]
    CantOpenDatabase {
        /// Database file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Statement construction or row decoding failed (including
    /// foreign-table conditions).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A statement failed, or a uniqueness assertion did not hold.
    #[error("query failed: {message}")]
    Query {
        /// What was being run.
        message: String,
        /// Driver error, when the failure came from the driver.
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Waiting for the connection lock took too long.
    #[error("timed out after {waited:?} waiting for the lock on {path}")]
    LockTimeout {
        /// Database file.
        path: PathBuf,
        /// How long the caller waited.
        waited: Duration,
    },

    /// A statement exceeded the hard timeout; the connection was closed.
    #[error("statement on {path} exceeded {elapsed:?}; connection closed")]
    HardTimeout {
        /// Database file.
        path: PathBuf,
        /// Time spent before the statement was abandoned.
        elapsed: Duration,
    },

    /// The connection was closed, explicitly or by the watchdog.
    #[error("connection to {path} is closed")]
    ConnectionClosed {
        /// Database file.
        path: PathBuf,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction already finished")]
    TransactionFinished,

    /// The file was written by a newer schema than this binary knows.
    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew {
        /// Version found in the file.
        found: i64,
        /// Highest version this schema knows.
        supported: i64,
    },

    /// No upgrade step starts at the stored version.
    #[error("schema {schema} has no upgrade step from version {from}")]
    MissingUpgradeStep {
        /// Schema name.
        schema: &'static str,
        /// Stored version.
        from: i64,
    },

    /// `create` was asked to overwrite an existing file.
    #[error("database file already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Driver error outside of a user statement (pragmas, BEGIN/COMMIT).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (restore, metadata).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a driver failure of `sql`.
    pub(crate) fn query(sql: &str, source: sqlx::Error) -> Self {
        Self::Query {
            message: format!("error running `{sql}`"),
            source: Some(source),
        }
    }

    /// Returns true for foreign-table condition errors.
    #[must_use]
    pub const fn is_invalid_where_clause(&self) -> bool {
        matches!(self, Self::Core(CoreError::InvalidWhereClause { .. }))
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
