//! SessionManager: login sessions and their expiry.

use chrono::{DateTime, Duration, Utc};
use microdb::{SchemaDefinition, StepAction, TableInfo, UpgradeStep};
use microdb_derive::Table;
use uuid::Uuid;

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Session")]
pub struct Session {
    #[column(name = "UserID")]
    pub user_id: Uuid,
    pub max_age: Duration,
    /// Refreshed on every use; sessions past this are purged.
    pub when_to_delete: DateTime<Utc>,
    pub keep_alive: bool,
    #[column(name = "SessionID", primary_key)]
    pub session_id: Uuid,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Session" (
    "UserID" BLOB NOT NULL,
    "MaxAge" INTEGER NOT NULL,
    "WhenToDelete" INTEGER NOT NULL,
    "KeepAlive" INTEGER NOT NULL,
    "SessionID" BLOB NOT NULL PRIMARY KEY
);
CREATE INDEX "Session_WhenToDelete" ON "Session" ("WhenToDelete");
"#;

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "SessionManager",
    target_version: 3,
    create_sql: CREATE_SQL,
    steps: &[
        UpgradeStep {
            from: 1,
            description: "index session expiry",
            action: StepAction::Sql(r#"CREATE INDEX "Session_WhenToDelete" ON "Session" ("WhenToDelete");"#),
        },
        UpgradeStep {
            from: 2,
            description: "add Session.KeepAlive",
            action: StepAction::Sql(r#"ALTER TABLE "Session" ADD COLUMN "KeepAlive" INTEGER NOT NULL DEFAULT 0;"#),
        },
    ],
    tables: &[TableInfo::of::<SessionTable>()],
};
