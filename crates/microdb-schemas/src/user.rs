//! User: per-user settings, notifications and federation state.
//!
//! `Pairs` here is a different table from
//! [`crate::name_value_pairs::Pair`] even though both are stored under
//! the same SQL name; conditions built for one are rejected by the other.

use chrono::{DateTime, Utc};
use microdb::{SchemaDefinition, StepAction, TableInfo, UpgradeStep};
use microdb_derive::Table;

microdb::sql_enum! {
    /// Whether a notification was seen.
    pub enum NotificationState {
        Unread = 0,
        Read = 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Pairs")]
pub struct Pair {
    pub value: String,
    #[column(primary_key)]
    pub name: String,
}

/// A notification received from another identity.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Notification")]
pub struct Notification {
    pub time_stamp: DateTime<Utc>,
    pub sender: String,
    pub object_url: String,
    pub title: String,
    pub document_type: String,
    pub message_summary: String,
    pub state: NotificationState,
    #[column(primary_key)]
    pub notification_id: i64,
}

/// Payload attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "ChangeData")]
pub struct ChangeData {
    pub change_data: String,
    #[column(primary_key)]
    pub notification_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Sender")]
pub struct Sender {
    #[column(nullable)]
    pub sender_token: Option<String>,
    #[column(nullable)]
    pub recipient_token: Option<String>,
    #[column(name = "OpenID", primary_key)]
    pub open_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Token")]
pub struct Token {
    pub token: String,
    pub created: DateTime<Utc>,
    #[column(primary_key)]
    pub open_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Blocked")]
pub struct Blocked {
    #[column(primary_key)]
    pub open_id_or_domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "ObjectState")]
pub struct ObjectState {
    pub object_state: i32,
    #[column(primary_key)]
    pub object_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Deleted")]
pub struct Deleted {
    pub open_id: String,
    #[column(primary_key)]
    pub object_url: String,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Pairs" (
    "Value" TEXT NOT NULL,
    "Name" TEXT NOT NULL PRIMARY KEY
);
CREATE TABLE "Notification" (
    "TimeStamp" INTEGER NOT NULL,
    "Sender" TEXT NOT NULL,
    "ObjectUrl" TEXT NOT NULL,
    "Title" TEXT NOT NULL,
    "DocumentType" TEXT NOT NULL,
    "MessageSummary" TEXT NOT NULL,
    "State" INTEGER NOT NULL,
    "NotificationId" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT
);
CREATE INDEX "Notification_TimeStamp" ON "Notification" ("TimeStamp");
CREATE INDEX "Notification_Sender" ON "Notification" ("Sender");
CREATE INDEX "Notification_ObjectUrl" ON "Notification" ("ObjectUrl");
CREATE INDEX "Notification_Title" ON "Notification" ("Title");
CREATE INDEX "Notification_DocumentType" ON "Notification" ("DocumentType");
CREATE INDEX "Notification_State" ON "Notification" ("State");
CREATE TABLE "ChangeData" (
    "ChangeData" TEXT NOT NULL,
    "NotificationId" INTEGER NOT NULL PRIMARY KEY REFERENCES "Notification" ("NotificationId")
);
CREATE TABLE "Sender" (
    "SenderToken" TEXT,
    "RecipientToken" TEXT,
    "OpenID" TEXT NOT NULL PRIMARY KEY
);
CREATE INDEX "Sender_SenderToken" ON "Sender" ("SenderToken");
CREATE INDEX "Sender_RecipientToken" ON "Sender" ("RecipientToken");
CREATE TABLE "Token" (
    "Token" TEXT NOT NULL,
    "Created" INTEGER NOT NULL,
    "OpenId" TEXT NOT NULL PRIMARY KEY
);
CREATE INDEX "Token_Token" ON "Token" ("Token");
CREATE TABLE "Blocked" (
    "OpenIdOrDomain" TEXT NOT NULL PRIMARY KEY
);
CREATE TABLE "ObjectState" (
    "ObjectState" INTEGER NOT NULL,
    "ObjectUrl" TEXT NOT NULL PRIMARY KEY
);
CREATE TABLE "Deleted" (
    "OpenId" TEXT NOT NULL,
    "ObjectUrl" TEXT NOT NULL PRIMARY KEY
);
"#;

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "User",
    target_version: 2,
    create_sql: CREATE_SQL,
    steps: &[UpgradeStep {
        from: 1,
        description: "index notifications, senders and tokens",
        action: StepAction::Sql(
            r#"
CREATE INDEX "Notification_TimeStamp" ON "Notification" ("TimeStamp");
CREATE INDEX "Notification_Sender" ON "Notification" ("Sender");
CREATE INDEX "Notification_ObjectUrl" ON "Notification" ("ObjectUrl");
CREATE INDEX "Notification_Title" ON "Notification" ("Title");
CREATE INDEX "Notification_DocumentType" ON "Notification" ("DocumentType");
CREATE INDEX "Notification_State" ON "Notification" ("State");
CREATE INDEX "Sender_SenderToken" ON "Sender" ("SenderToken");
CREATE INDEX "Sender_RecipientToken" ON "Sender" ("RecipientToken");
CREATE INDEX "Token_Token" ON "Token" ("Token");
"#,
        ),
    }],
    tables: &[
        TableInfo::of::<PairTable>(),
        TableInfo::of::<NotificationTable>(),
        TableInfo::of::<ChangeDataTable>(),
        TableInfo::of::<SenderTable>(),
        TableInfo::of::<TokenTable>(),
        TableInfo::of::<BlockedTable>(),
        TableInfo::of::<ObjectStateTable>(),
        TableInfo::of::<DeletedTable>(),
    ],
};
