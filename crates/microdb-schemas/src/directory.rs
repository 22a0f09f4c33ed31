//! Directory: file metadata, permissions and relationships between files.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use microdb::{ColumnExt, Query, SchemaDefinition, StepAction, TableInfo, Transaction, UpgradeStep};
use microdb_derive::Table;
use tracing::info;
use uuid::Uuid;

microdb::sql_enum! {
    /// Access level granted by a [`Permission`] row.
    pub enum FilePermission {
        Read = 1,
        Write = 2,
        Administer = 3,
    }
}

/// One file or directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "File", derive_fields = "derive_extension")]
pub struct File {
    /// Unique name within the directory.
    pub name: String,
    /// Text after the last `.` of the name, derived on every write of `name`.
    pub extension: String,
    pub type_id: String,
    #[column(nullable)]
    pub owner_id: Option<Uuid>,
    pub created: DateTime<Utc>,
    #[column(primary_key)]
    pub file_id: i64,
}

/// Returns the extension stored for `name`: the text after its last `.`,
/// or the empty string.
#[must_use]
pub fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, extension)| extension)
}

fn derive_extension(file: &mut FileInserter) {
    if let Some(name) = &file.name {
        file.extension = Some(extension_of(name).to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Permission")]
pub struct Permission {
    #[column(nullable)]
    pub file_id: Option<i64>,
    pub user_or_group_id: Uuid,
    pub level: FilePermission,
    pub inherit: bool,
    pub send_notifications: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Metadata")]
pub struct Metadata {
    pub value: String,
    #[column(primary_key)]
    pub name: String,
}

/// A typed link from one file to another.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Relationships")]
pub struct Relationship {
    pub file_id: i64,
    pub referenced_file_id: i64,
    pub relationship: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "NamedPermission")]
pub struct NamedPermission {
    pub file_id: i64,
    pub named_permission: String,
    pub user_or_group: Uuid,
    pub inherit: bool,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "File" (
    "Name" TEXT NOT NULL UNIQUE,
    "Extension" TEXT NOT NULL,
    "TypeId" TEXT NOT NULL,
    "OwnerId" BLOB,
    "Created" INTEGER NOT NULL,
    "FileId" INTEGER PRIMARY KEY
);
CREATE INDEX "File_Name" ON "File" ("Name");
CREATE INDEX "File_Extension" ON "File" ("Extension");
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
CREATE INDEX "Metadata_Name" ON "Metadata" ("Name");
CREATE TABLE "Relationships" (
    "FileId" INTEGER REFERENCES "File" ("FileId"),
    "ReferencedFileId" INTEGER,
    "Relationship" TEXT NOT NULL
);
CREATE INDEX "Relationships_ReferencedFileId" ON "Relationships" ("ReferencedFileId");
CREATE INDEX "Relationships_Relationship" ON "Relationships" ("Relationship");
CREATE INDEX "Relationships_FileId_Relationship" ON "Relationships" ("FileId", "Relationship");
CREATE INDEX "Relationships_ReferencedFileId_Relationship" ON "Relationships" ("ReferencedFileId", "Relationship");
CREATE UNIQUE INDEX "Relationships_FileId_ReferencedFileId_Relationship" ON "Relationships" ("FileId", "ReferencedFileId", "Relationship");
CREATE TABLE "NamedPermission" (
    "FileId" INTEGER REFERENCES "File" ("FileId"),
    "NamedPermission" TEXT NOT NULL,
    "UserOrGroup" BLOB NOT NULL,
    "Inherit" INTEGER NOT NULL
);
CREATE INDEX "NamedPermission_FileId" ON "NamedPermission" ("FileId");
CREATE UNIQUE INDEX "NamedPermission_FileId_NamedPermission_UserOrGroup" ON "NamedPermission" ("FileId", "NamedPermission", "UserOrGroup");
"#;

const NAME_INDEXES: &str = r#"
CREATE INDEX "File_Name" ON "File" ("Name");
CREATE INDEX "Metadata_Name" ON "Metadata" ("Name");
"#;

const EXTENSION_AND_RELATIONSHIPS: &str = r#"
ALTER TABLE "File" ADD COLUMN "Extension" TEXT NOT NULL DEFAULT '';
CREATE INDEX "File_Extension" ON "File" ("Extension");
CREATE TABLE "Relationships" (
    "FileId" INTEGER REFERENCES "File" ("FileId"),
    "ReferencedFileId" INTEGER,
    "Relationship" TEXT NOT NULL
);
CREATE INDEX "Relationships_ReferencedFileId" ON "Relationships" ("ReferencedFileId");
CREATE INDEX "Relationships_Relationship" ON "Relationships" ("Relationship");
CREATE INDEX "Relationships_FileId_Relationship" ON "Relationships" ("FileId", "Relationship");
CREATE INDEX "Relationships_ReferencedFileId_Relationship" ON "Relationships" ("ReferencedFileId", "Relationship");
CREATE UNIQUE INDEX "Relationships_FileId_ReferencedFileId_Relationship" ON "Relationships" ("FileId", "ReferencedFileId", "Relationship");
"#;

const NAMED_PERMISSION: &str = r#"
CREATE TABLE "NamedPermission" (
    "FileId" INTEGER REFERENCES "File" ("FileId"),
    "NamedPermission" TEXT NOT NULL,
    "UserOrGroup" BLOB NOT NULL,
    "Inherit" INTEGER NOT NULL
);
CREATE INDEX "NamedPermission_FileId" ON "NamedPermission" ("FileId");
CREATE UNIQUE INDEX "NamedPermission_FileId_NamedPermission_UserOrGroup" ON "NamedPermission" ("FileId", "NamedPermission", "UserOrGroup");
"#;

/// Recomputes `Extension` for every file from its name.
fn backfill_extensions(tx: &mut Transaction) -> BoxFuture<'_, microdb::Result<()>> {
    Box::pin(async move {
        let files = tx.table::<FileTable>().select_vec(Query::all()).await?;
        let mut changed = 0_u64;
        for file in files {
            if file.extension == extension_of(&file.name) {
                continue;
            }
            changed += tx
                .table::<FileTable>()
                .update(Some(FileTable::file_id().eq(file.file_id)), |w| {
                    w.name(file.name);
                })
                .await?;
        }
        info!(files = changed, "Backfilled file extensions");
        Ok(())
    })
}

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "Directory",
    target_version: 5,
    create_sql: CREATE_SQL,
    steps: &[
        UpgradeStep {
            from: 1,
            description: "index file and metadata names",
            action: StepAction::Sql(NAME_INDEXES),
        },
        UpgradeStep {
            from: 2,
            description: "add File.Extension and Relationships",
            action: StepAction::Sql(EXTENSION_AND_RELATIONSHIPS),
        },
        UpgradeStep {
            from: 3,
            description: "backfill File.Extension",
            action: StepAction::Backfill(backfill_extensions),
        },
        UpgradeStep {
            from: 4,
            description: "add NamedPermission",
            action: StepAction::Sql(NAMED_PERMISSION),
        },
    ],
    tables: &[
        TableInfo::of::<FileTable>(),
        TableInfo::of::<PermissionTable>(),
        TableInfo::of::<MetadataTable>(),
        TableInfo::of::<RelationshipTable>(),
        TableInfo::of::<NamedPermissionTable>(),
    ],
};
