#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use microdb::{
    ColumnExt, Connection, Connector, ConnectorConfig, SchemaDefinition, StepAction, TableInfo,
    Transaction, UpgradeStep,
};
use microdb_derive::Table;
use sqlx::{ConnectOptions, Connection as _};
use uuid::Uuid;

/// A name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Pairs")]
pub struct Pair {
    #[column(primary_key)]
    pub name: String,
    pub value: String,
}

/// A note with an autoincrement key.
#[derive(Debug, Clone, PartialEq, Table)]
#[table(name = "Note")]
pub struct Note {
    #[column(primary_key)]
    pub note_id: i64,
    pub body: String,
    pub created: DateTime<Utc>,
    #[column(nullable)]
    pub author: Option<Uuid>,
    pub pinned: bool,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Pairs" (
    "Name" TEXT PRIMARY KEY NOT NULL,
    "Value" TEXT NOT NULL
);
CREATE TABLE "Note" (
    "NoteId" INTEGER PRIMARY KEY AUTOINCREMENT,
    "Body" TEXT NOT NULL,
    "Created" INTEGER NOT NULL,
    "Author" BLOB NULL,
    "Pinned" INTEGER NOT NULL DEFAULT 0
);
"#;

/// The schema as it looked at version 1, before notes could be pinned.
pub const CREATE_SQL_V1: &str = r#"
CREATE TABLE "Pairs" (
    "Name" TEXT PRIMARY KEY NOT NULL,
    "Value" TEXT NOT NULL
);
CREATE TABLE "Note" (
    "NoteId" INTEGER PRIMARY KEY AUTOINCREMENT,
    "Body" TEXT NOT NULL,
    "Created" INTEGER NOT NULL,
    "Author" BLOB NULL
);
PRAGMA user_version = 1;
"#;

fn pin_bang_notes(tx: &mut Transaction) -> BoxFuture<'_, microdb::Result<()>> {
    Box::pin(async move {
        tx.table::<NoteTable>()
            .update(Some(NoteTable::body().like("!%")), |w| {
                w.pinned(true);
            })
            .await?;
        Ok(())
    })
}

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "Notes",
    target_version: 3,
    create_sql: CREATE_SQL,
    steps: &[
        UpgradeStep {
            from: 1,
            description: "add Note.Pinned",
            action: StepAction::Sql(
                r#"ALTER TABLE "Note" ADD COLUMN "Pinned" INTEGER NOT NULL DEFAULT 0"#,
            ),
        },
        UpgradeStep {
            from: 2,
            description: "pin notes starting with !",
            action: StepAction::Backfill(pin_bang_notes),
        },
    ],
    tables: &[TableInfo::of::<PairTable>(), TableInfo::of::<NoteTable>()],
};

/// Same tables, but no way up from version 1.
pub static GAPPED_SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "Gapped",
    target_version: 3,
    create_sql: CREATE_SQL,
    steps: &[UpgradeStep {
        from: 2,
        description: "pin notes starting with !",
        action: StepAction::Backfill(pin_bang_notes),
    }],
    tables: &[TableInfo::of::<PairTable>(), TableInfo::of::<NoteTable>()],
};

pub fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("test.db")
}

pub fn quick_config() -> ConnectorConfig {
    ConnectorConfig::default()
        .lock_timeout(Duration::from_millis(200))
        .statement_timeouts(Duration::from_millis(50), Duration::from_millis(200))
}

pub async fn fresh(dir: &tempfile::TempDir) -> Connection {
    Connector::new(db_path(dir), &SCHEMA)
        .open_or_create()
        .await
        .unwrap()
}

/// Writes a version-1 database directly with the driver.
pub async fn write_v1(path: &Path, notes: &[&str]) {
    let mut conn = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::raw_sql(CREATE_SQL_V1).execute(&mut conn).await.unwrap();
    for body in notes {
        sqlx::query(r#"INSERT INTO "Note" ("Body", "Created") VALUES (?, 0)"#)
            .bind(*body)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 11, 2, 8, 15, 0).unwrap()
}

pub async fn add_note(conn: &Connection, body: &str) -> i64 {
    conn.table::<NoteTable>()
        .insert_and_return_primary_key(|w| {
            w.body(body).created(fixed_time());
        })
        .await
        .unwrap()
}

pub async fn add_pair(conn: &Connection, name: &str, value: &str) {
    conn.table::<PairTable>()
        .insert(|w| {
            w.name(name).value(value);
        })
        .await
        .unwrap();
}

/// A statement that keeps SQLite busy for a long time.
pub const SLOW_SQL: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 200000000) SELECT count(*) FROM c";
