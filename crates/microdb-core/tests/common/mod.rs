#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use microdb_core::{CoreError, Statement};
use microdb_derive::Table;
use uuid::Uuid;

microdb_core::sql_enum! {
    /// Severity used by the fixture tables.
    pub enum Severity {
        Low = 0,
        High = 1,
    }
}

/// A file entry with a derived extension.
#[derive(Debug, Clone, PartialEq, Table)]
#[table(name = "File", derive_fields = "derive_extension")]
pub struct File {
    #[column(name = "Name")]
    pub name: String,
    #[column(name = "Extension")]
    pub extension: String,
    #[column(name = "OwnerId", nullable)]
    pub owner_id: Option<Uuid>,
    #[column(name = "Created")]
    pub created: DateTime<Utc>,
    #[column(name = "FileId", primary_key)]
    pub file_id: i64,
}

pub fn derive_extension(w: &mut FileInserter) {
    if let Some(name) = &w.name {
        let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext).to_string();
        w.extension = Some(ext);
    }
}

/// A row using every supported column type.
#[derive(Debug, Clone, PartialEq, Table)]
#[table(name = "Everything")]
pub struct Everything {
    pub text: String,
    pub int: i64,
    pub small: i32,
    pub flag: bool,
    pub real: f64,
    pub bytes: Vec<u8>,
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub span: Duration,
    pub severity: Severity,
    #[column(nullable)]
    pub maybe_text: Option<String>,
    #[column(nullable)]
    pub maybe_id: Option<Uuid>,
}

/// Same SQL name as [`File`], different table.
#[derive(Debug, Clone, Table)]
#[table(name = "File")]
pub struct ShadowFile {
    #[column(name = "Name", primary_key)]
    pub name: String,
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
}

pub fn ok_statement(result: Result<Statement, CoreError>) -> Statement {
    result.unwrap_or_else(|e| panic!("statement failed to build: {e}"))
}
