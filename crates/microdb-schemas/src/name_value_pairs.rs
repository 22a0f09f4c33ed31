//! NameValuePairs: a flat settings store.

use microdb::{SchemaDefinition, StepAction, TableInfo, UpgradeStep};
use microdb_derive::Table;

#[derive(Debug, Clone, PartialEq, Eq, Table)]
#[table(name = "Pairs")]
pub struct Pair {
    pub value: String,
    #[column(primary_key)]
    pub name: String,
}

pub const CREATE_SQL: &str = r#"
CREATE TABLE "Pairs" (
    "Value" TEXT NOT NULL,
    "Name" TEXT NOT NULL PRIMARY KEY
);
CREATE INDEX "Pairs_Name" ON "Pairs" ("Name");
"#;

pub static SCHEMA: SchemaDefinition = SchemaDefinition {
    name: "NameValuePairs",
    target_version: 2,
    create_sql: CREATE_SQL,
    steps: &[UpgradeStep {
        from: 1,
        description: "index pair names",
        action: StepAction::Sql(r#"CREATE INDEX "Pairs_Name" ON "Pairs" ("Name");"#),
    }],
    tables: &[TableInfo::of::<PairTable>()],
};
