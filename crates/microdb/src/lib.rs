//! # microdb
//!
//! Typed access to small embedded SQLite databases, one file per schema.
//!
//! - [`Connector`] opens, creates, upgrades and restores a database file
//! - [`Connection`] serializes every statement through one connection
//!   lock, with soft and hard statement timeouts
//! - [`Transaction`] holds the lock from `BEGIN` to `COMMIT`/`ROLLBACK`
//! - [`TableHandle`] runs typed SELECT, INSERT, UPDATE, DELETE and COUNT
//!   statements built from `#[derive(Table)]` types
//!
//! ## Example
//!
//! ```ignore
//! use microdb::{Connector, ColumnExt};
//!
//! let conn = Connector::new("settings.db", &SCHEMA).open_or_create().await?;
//! conn.table::<PairsTable>()
//!     .insert(|w| { w.name("theme").value("dark"); })
//!     .await?;
//!
//! conn.call_on_transaction(|tx| Box::pin(async move {
//!     tx.table::<PairsTable>()
//!         .update(Some(PairsTable::name().eq("theme")), |w| { w.value("light"); })
//!         .await?;
//!     tx.commit().await
//! }))
//! .await?;
//! ```

mod bind;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod stream;
pub mod table;
pub mod transaction;
pub mod upgrade;
mod watchdog;

pub use config::ConnectorConfig;
pub use connection::{Connection, DatabaseWritten};
pub use connector::{Connector, FaultHandler};
pub use error::{Error, Result};
pub use stream::RowStream;
pub use table::TableHandle;
pub use transaction::Transaction;
pub use upgrade::{Backfill, SchemaDefinition, StepAction, UpgradeReport, UpgradeStep};

pub use microdb_core::{
    sql_enum, ColumnExt, Condition, CoreError, FromSqlValue, Inserter, Query, SortOrder, SqlValue,
    Table, TableInfo, ToSqlValue,
};
