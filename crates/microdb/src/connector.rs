//! Opening, creating and restoring database files.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use tokio::time::timeout;
use tracing::{error, info};

use crate::config::ConnectorConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::upgrade::{self, SchemaDefinition, UpgradeReport};

/// Callback invoked when a database cannot be opened.
pub type FaultHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Opens one database file against one schema.
///
/// ```ignore
/// let connector = Connector::new("settings.db", &name_value_pairs::SCHEMA);
/// let conn = connector.open_or_create().await?;
/// ```
#[derive(Clone)]
pub struct Connector {
    path: PathBuf,
    schema: &'static SchemaDefinition,
    config: ConnectorConfig,
    fault_handler: Option<FaultHandler>,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("path", &self.path)
            .field("schema", &self.schema.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Creates a connector with default timeouts.
    pub fn new(path: impl Into<PathBuf>, schema: &'static SchemaDefinition) -> Self {
        Self {
            path: path.into(),
            schema,
            config: ConnectorConfig::default(),
            fault_handler: None,
        }
    }

    /// Replaces the timeouts.
    #[must_use]
    pub const fn with_config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a callback run before [`Error::CantOpenDatabase`] is
    /// returned.
    #[must_use]
    pub fn with_fault_handler(mut self, handler: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.fault_handler = Some(Arc::new(handler));
        self
    }

    /// The database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The schema this connector opens files against.
    #[must_use]
    pub const fn schema(&self) -> &'static SchemaDefinition {
        self.schema
    }

    /// Creates a new file at the schema's target version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the file exists, or an open or
    /// driver error.
    pub async fn create(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            return Err(Error::AlreadyExists(self.path.clone()));
        }
        let connection = self.open(true).await?;
        let created = upgrade::initialize(&connection, self.schema).await;
        connection.close().await?;
        created?;
        info!(
            path = %self.path.display(),
            schema = %self.schema.name,
            version = self.schema.target_version,
            "Created database"
        );
        Ok(())
    }

    /// Opens an existing file and upgrades it to the target version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CantOpenDatabase`] when the file cannot be opened,
    /// or an upgrade error.
    pub async fn connect(&self) -> Result<Connection> {
        let connection = self.open(false).await?;
        upgrade::run(&connection, self.schema).await?;
        Ok(connection)
    }

    /// Opens the file, creating it first when missing.
    ///
    /// # Errors
    ///
    /// See [`Connector::create`] and [`Connector::connect`].
    pub async fn open_or_create(&self) -> Result<Connection> {
        if !tokio::fs::try_exists(&self.path).await? {
            self.create().await?;
        }
        self.connect().await
    }

    /// Opens the file, upgrades it, and closes it again.
    ///
    /// # Errors
    ///
    /// See [`Connector::connect`].
    pub async fn upgrade(&self) -> Result<UpgradeReport> {
        let connection = self.open(false).await?;
        let report = upgrade::run(&connection, self.schema).await;
        connection.close().await?;
        report
    }

    /// Reads the version stored in the file without upgrading it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CantOpenDatabase`] or a driver error.
    pub async fn stored_version(&self) -> Result<i64> {
        let connection = self.open(false).await?;
        let version = connection.user_version().await;
        connection.close().await?;
        version
    }

    /// Replaces the database file with a copy of `backup`.
    ///
    /// No connection to the file may be open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the copy fails.
    pub async fn restore(&self, backup: impl AsRef<Path>) -> Result<()> {
        let backup = backup.as_ref();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::copy(backup, &self.path).await?;
        info!(
            path = %self.path.display(),
            backup = %backup.display(),
            "Restored database from backup"
        );
        Ok(())
    }

    async fn open(&self, create: bool) -> Result<Connection> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(create)
            .busy_timeout(self.config.lock_timeout)
            .disable_statement_logging();

        let reason = match timeout(self.config.open_timeout, options.connect()).await {
            Ok(Ok(conn)) => {
                info!(path = %self.path.display(), "Opened database");
                return Ok(Connection::new(self.path.clone(), self.config, conn));
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("open did not finish within {:?}", self.config.open_timeout),
        };

        let err = Error::CantOpenDatabase {
            path: self.path.clone(),
            reason,
        };
        error!(error = %err, "Cannot open database");
        if let Some(handler) = &self.fault_handler {
            handler(&err);
        }
        Err(err)
    }
}
