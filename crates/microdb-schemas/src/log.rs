//! Log: the audit log, its exception/logger classes and per-level retention.

use chrono::{DateTime, Duration, Utc};
use microdb::{SchemaDefinition, StepAction, TableInfo, UpgradeStep};
use microdb_derive::Table;
use uuid::Uuid;

microdb::sql_enum! {
    /// Severity of a log entry.
    pub enum LoggingLevel {
        Trace = 0,
        Debug = 1,
        Info = 2,
        Warn = 3,
        Error = 4,
        Fatal = 5,
    }
}

/// A logger or exception class name, interned to an integer id.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Classes")]
pub struct Class {
    pub name: String,
    #[column(primary_key)]
    pub class_id: i64,
}

/// One log entry.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Log")]
pub struct LogEntry {
    pub class_id: i64,
    pub time_stamp: DateTime<Utc>,
    pub level: LoggingLevel,
    pub thread_id: i64,
    #[column(nullable)]
    pub session_id: Option<Uuid>,
    #[column(nullable)]
    pub remote_end_point: Option<String>,
    #[column(nullable)]
    pub user_id: Option<Uuid>,
    pub message: String,
    #[column(nullable)]
    pub exception_class_id: Option<i64>,
    #[column(nullable)]
    pub exception_message: Option<String>,
    #[column(nullable)]
    pub exception_stack_trace: Option<String>,
}

/// How long entries of one level are kept.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Lifespan")]
pub struct Lifespan {
    pub timespan: Duration,
    #[column(primary_key)]
    pub level: LoggingLevel,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Classes" (
    "Name" TEXT NOT NULL UNIQUE,
    "ClassId" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT
);
CREATE INDEX "Classes_Name" ON "Classes" ("Name");
CREATE TABLE "Log" (
    "ClassId" INTEGER NOT NULL,
    "TimeStamp" INTEGER NOT NULL,
    "Level" INTEGER NOT NULL,
    "ThreadId" INTEGER NOT NULL,
    "SessionId" BLOB,
    "RemoteEndPoint" TEXT,
    "UserId" BLOB,
    "Message" TEXT NOT NULL,
    "ExceptionClassId" INTEGER,
    "ExceptionMessage" TEXT,
    "ExceptionStackTrace" TEXT
);
CREATE INDEX "Log_ClassId" ON "Log" ("ClassId");
CREATE INDEX "Log_TimeStamp" ON "Log" ("TimeStamp");
CREATE INDEX "Log_Level" ON "Log" ("Level");
CREATE INDEX "Log_ThreadId" ON "Log" ("ThreadId");
CREATE INDEX "Log_SessionId" ON "Log" ("SessionId");
CREATE INDEX "Log_RemoteEndPoint" ON "Log" ("RemoteEndPoint");
CREATE INDEX "Log_UserId" ON "Log" ("UserId");
CREATE INDEX "Log_ExceptionClassId" ON "Log" ("ExceptionClassId");
CREATE INDEX "Log_TimeStamp_Level" ON "Log" ("TimeStamp", "Level");
CREATE TABLE "Lifespan" (
    "Timespan" INTEGER NOT NULL,
    "Level" INTEGER NOT NULL PRIMARY KEY
);
"#;

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "Log",
    target_version: 4,
    create_sql: CREATE_SQL,
    steps: &[
        UpgradeStep {
            from: 1,
            description: "index log columns",
            action: StepAction::Sql(
                r#"
CREATE INDEX "Classes_Name" ON "Classes" ("Name");
CREATE INDEX "Log_ClassId" ON "Log" ("ClassId");
CREATE INDEX "Log_TimeStamp" ON "Log" ("TimeStamp");
CREATE INDEX "Log_Level" ON "Log" ("Level");
CREATE INDEX "Log_ThreadId" ON "Log" ("ThreadId");
CREATE INDEX "Log_SessionId" ON "Log" ("SessionId");
CREATE INDEX "Log_RemoteEndPoint" ON "Log" ("RemoteEndPoint");
CREATE INDEX "Log_UserId" ON "Log" ("UserId");
CREATE INDEX "Log_ExceptionClassId" ON "Log" ("ExceptionClassId");
"#,
            ),
        },
        UpgradeStep {
            from: 2,
            description: "index log by time and level",
            action: StepAction::Sql(r#"CREATE INDEX "Log_TimeStamp_Level" ON "Log" ("TimeStamp", "Level");"#),
        },
        UpgradeStep {
            from: 3,
            description: "add Log.ExceptionStackTrace",
            action: StepAction::Sql(r#"ALTER TABLE "Log" ADD COLUMN "ExceptionStackTrace" TEXT;"#),
        },
    ],
    tables: &[
        TableInfo::of::<ClassTable>(),
        TableInfo::of::<LogEntryTable>(),
        TableInfo::of::<LifespanTable>(),
    ],
};
