//! UserManager: users, groups and group membership.

use chrono::{DateTime, Utc};
use microdb::{SchemaDefinition, StepAction, TableInfo, UpgradeStep};
use microdb_derive::Table;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Users")]
pub struct User {
    pub password_hash: String,
    #[column(name = "ID")]
    pub id: Uuid,
    pub built_in: bool,
    #[column(primary_key)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Groups")]
pub struct Group {
    #[column(name = "ID")]
    pub id: Uuid,
    #[column(name = "OwnerID", nullable)]
    pub owner_id: Option<Uuid>,
    pub built_in: bool,
    /// Membership is computed by the host rather than stored.
    pub automatic: bool,
    #[column(primary_key)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "UserInGroups")]
pub struct UserInGroup {
    #[column(name = "UserID")]
    pub user_id: Uuid,
    #[column(name = "GroupID")]
    pub group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "AssociationHandles")]
pub struct AssociationHandle {
    #[column(name = "UserID")]
    pub user_id: Uuid,
    pub association_handle: String,
    pub timestamp: DateTime<Utc>,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Users" (
    "PasswordHash" TEXT NOT NULL,
    "ID" BLOB NOT NULL UNIQUE,
    "BuiltIn" INTEGER NOT NULL,
    "Name" TEXT NOT NULL PRIMARY KEY
);
CREATE INDEX "Users_ID" ON "Users" ("ID");
CREATE TABLE "Groups" (
    "ID" BLOB NOT NULL UNIQUE,
    "OwnerID" BLOB,
    "BuiltIn" INTEGER NOT NULL,
    "Automatic" INTEGER NOT NULL,
    "Name" TEXT NOT NULL PRIMARY KEY
);
CREATE INDEX "Groups_ID" ON "Groups" ("ID");
CREATE TABLE "UserInGroups" (
    "UserID" BLOB NOT NULL,
    "GroupID" BLOB NOT NULL
);
CREATE INDEX "UserInGroups_UserID" ON "UserInGroups" ("UserID");
CREATE INDEX "UserInGroups_GroupID" ON "UserInGroups" ("GroupID");
CREATE TABLE "AssociationHandles" (
    "UserID" BLOB NOT NULL,
    "AssociationHandle" TEXT NOT NULL,
    "Timestamp" INTEGER NOT NULL
);
CREATE INDEX "AssociationHandles_UserID" ON "AssociationHandles" ("UserID");
"#;

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "UserManager",
    target_version: 2,
    create_sql: CREATE_SQL,
    steps: &[UpgradeStep {
        from: 1,
        description: "index user and group ids",
        action: StepAction::Sql(
            r#"
CREATE INDEX "Users_ID" ON "Users" ("ID");
CREATE INDEX "Groups_ID" ON "Groups" ("ID");
CREATE INDEX "UserInGroups_UserID" ON "UserInGroups" ("UserID");
CREATE INDEX "UserInGroups_GroupID" ON "UserInGroups" ("GroupID");
CREATE INDEX "AssociationHandles_UserID" ON "AssociationHandles" ("UserID");
"#,
        ),
    }],
    tables: &[
        TableInfo::of::<UserTable>(),
        TableInfo::of::<GroupTable>(),
        TableInfo::of::<UserInGroupTable>(),
        TableInfo::of::<AssociationHandleTable>(),
    ],
};
