//! Schema definitions and stepwise upgrades.
//!
//! A database file records its schema version in `PRAGMA user_version`.
//! Opening a file runs each step from the stored version up to the
//! schema's target, every step in its own transaction together with the
//! version bump, so an interrupted upgrade resumes at the step that
//! failed.

use std::fmt;

use futures::future::BoxFuture;
use microdb_core::TableInfo;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transaction::Transaction;

/// A data migration run inside the step's transaction.
pub type Backfill = for<'t> fn(&'t mut Transaction) -> BoxFuture<'t, Result<()>>;

/// What an upgrade step does.
#[derive(Clone, Copy)]
pub enum StepAction {
    /// A batch of DDL or DML statements.
    Sql(&'static str),
    /// Typed code operating on the tables as they exist at this step.
    Backfill(Backfill),
}

impl fmt::Debug for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            Self::Backfill(_) => f.write_str("Backfill(..)"),
        }
    }
}

/// Brings a database from version `from` to `from + 1`.
#[derive(Debug, Clone, Copy)]
pub struct UpgradeStep {
    /// Version the step starts from.
    pub from: i64,
    /// Short description, used in logs.
    pub description: &'static str,
    /// The work to run.
    pub action: StepAction,
}

/// A versioned database schema.
#[derive(Debug)]
pub struct SchemaDefinition {
    /// Schema name, used in logs and errors.
    pub name: &'static str,
    /// Version stamped on newly created files and reached by upgrades.
    pub target_version: i64,
    /// DDL creating every table at the target version.
    pub create_sql: &'static str,
    /// Upgrade steps, one per version below the target.
    pub steps: &'static [UpgradeStep],
    /// Tables of the schema at the target version.
    pub tables: &'static [TableInfo],
}

impl SchemaDefinition {
    /// Returns the step starting at `version`.
    #[must_use]
    pub fn step_from(&self, version: i64) -> Option<&UpgradeStep> {
        self.steps.iter().find(|step| step.from == version)
    }

    /// Describes the table named `name`.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// What an upgrade did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Version found in the file.
    pub from: i64,
    /// Version after the upgrade.
    pub to: i64,
    /// Starting versions of the steps that ran, in order. Empty when a
    /// blank file was initialized straight to the target.
    pub applied: Vec<i64>,
}

impl UpgradeReport {
    /// Returns true when nothing had to be done.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Upgrades the database behind `connection` to `schema.target_version`.
///
/// A file at version 0 without any table, such as one left behind by an
/// interrupted create, is initialized from `create_sql`.
pub(crate) async fn run(connection: &Connection, schema: &SchemaDefinition) -> Result<UpgradeReport> {
    let from = connection.user_version().await?;
    if from == 0 && connection.is_blank().await? {
        info!(schema = %schema.name, "Initializing blank database");
        initialize(connection, schema).await?;
        return Ok(UpgradeReport {
            from,
            to: schema.target_version,
            applied: Vec::new(),
        });
    }
    if from > schema.target_version {
        return Err(Error::SchemaTooNew {
            found: from,
            supported: schema.target_version,
        });
    }

    let mut report = UpgradeReport {
        from,
        to: from,
        applied: Vec::new(),
    };
    if from == schema.target_version {
        debug!(schema = %schema.name, version = from, "Schema up to date");
        return Ok(report);
    }

    info!(
        schema = %schema.name,
        from = from,
        to = schema.target_version,
        "Upgrading schema"
    );
    let mut version = from;
    while version < schema.target_version {
        let step = schema.step_from(version).ok_or(Error::MissingUpgradeStep {
            schema: schema.name,
            from: version,
        })?;
        apply(connection, schema, step).await?;
        report.applied.push(version);
        version += 1;
    }
    report.to = version;

    info!(schema = %schema.name, version = version, "Schema upgraded");
    Ok(report)
}

/// Creates every table and stamps the target version, in one transaction.
pub(crate) async fn initialize(connection: &Connection, schema: &SchemaDefinition) -> Result<()> {
    let mut tx = connection.begin().await?;
    tx.execute_batch(schema.create_sql).await?;
    tx.set_user_version(schema.target_version).await?;
    tx.commit().await
}

async fn apply(connection: &Connection, schema: &SchemaDefinition, step: &UpgradeStep) -> Result<()> {
    info!(
        schema = %schema.name,
        from = step.from,
        step = %step.description,
        "Applying upgrade step"
    );
    let mut tx = connection.begin().await?;
    let outcome = match step.action {
        StepAction::Sql(sql) => tx.execute_batch(sql).await,
        StepAction::Backfill(backfill) => backfill(&mut tx).await,
    };
    match outcome {
        Ok(()) => {
            tx.set_user_version(step.from + 1).await?;
            tx.commit().await
        }
        Err(e) => {
            if !tx.is_finished() {
                tx.rollback().await?;
            }
            Err(e)
        }
    }
}
