#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{ConnectOptions, Connection as _};

/// The Directory schema as it looked at version 1.
pub const DIRECTORY_V1: &str = r#"
CREATE TABLE "File" (
    "Name" TEXT NOT NULL UNIQUE,
    "TypeId" TEXT NOT NULL,
    "OwnerId" BLOB,
    "Created" INTEGER NOT NULL,
    "FileId" INTEGER PRIMARY KEY
);
CREATE TABLE "Permission" (
    "FileId" INTEGER REFERENCES "File" ("FileId"),
    "UserOrGroupId" BLOB NOT NULL,
    "Level" INTEGER NOT NULL,
    "Inherit" INTEGER NOT NULL,
    "SendNotifications" INTEGER NOT NULL
);
CREATE TABLE "Metadata" (
    "Value" TEXT NOT NULL,
    "Name" TEXT NOT NULL PRIMARY KEY
);
PRAGMA user_version = 1;
"#;

pub fn db_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{name}.db"))
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 26, 53).unwrap()
}

/// Writes a version-1 Directory file holding `names` directly with the driver.
pub async fn write_directory_v1(path: &Path, names: &[&str]) {
    let mut conn = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::raw_sql(DIRECTORY_V1).execute(&mut conn).await.unwrap();
    for name in names {
        sqlx::query(r#"INSERT INTO "File" ("Name", "TypeId", "Created") VALUES (?, 'Document', 0)"#)
            .bind(*name)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}
