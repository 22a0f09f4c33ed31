//! Tests for the `#[derive(Table)]` macro output.
//!
//! These tests verify that the derive macro generates:
//! - `{Struct}Table` implementing `Table`, including row decoding
//! - `{Struct}Columns` with one column type per field
//! - `{Struct}Inserter` that tracks exactly the assigned fields

mod common;

use common::*;
use microdb_core::schema::{Column, Inserter, Table, TableInfo};
use microdb_core::statement::{self, Query};
use microdb_core::{ColumnExt, CoreError, SqlValue, ToSqlValue};
use uuid::Uuid;

#[test]
fn test_table_metadata() {
    assert_eq!(FileTable::NAME, "File");
    assert_eq!(FileTable::table_name(), "File");
    assert_eq!(
        FileTable::COLUMNS,
        &["Name", "Extension", "OwnerId", "Created", "FileId"]
    );
    assert_eq!(FileTable::PRIMARY_KEY, Some("FileId"));
    let _: FileTable = File::table();
}

#[test]
fn test_default_column_names_are_pascal_case() {
    assert_eq!(EverythingTable::COLUMNS[0], "Text");
    assert_eq!(EverythingTable::COLUMNS[10], "MaybeText");
    assert_eq!(EverythingTable::PRIMARY_KEY, None);
}

#[test]
fn test_column_metadata() {
    assert_eq!(FileColumns::FileId::NAME, "FileId");
    const { assert!(FileColumns::FileId::PRIMARY_KEY) };
    const { assert!(!FileColumns::FileId::NULLABLE) };
    const { assert!(FileColumns::OwnerId::NULLABLE) };
    let _: FileColumns::Name = FileTable::name();
}

#[test]
fn test_table_info() {
    let info = TableInfo::of::<FileTable>();
    assert_eq!(info.name, "File");
    assert_eq!(info.columns.len(), 5);
    assert_eq!(info.primary_key, Some("FileId"));
}

#[test]
fn test_inserter_tracks_assigned_fields() {
    let mut w = FileInserter::default();
    assert!(w.is_empty());
    w.created(fixed_time()).file_id(7);
    assert_eq!(w.changed_columns(), vec!["Created", "FileId"]);

    let assignments = w.into_assignments();
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[1], ("FileId", SqlValue::Int(7)));
}

#[test]
fn test_partial_insert_statement() {
    let mut w = FileInserter::default();
    w.owner_id(Uuid::nil());
    let stmt = statement::insert::<FileTable>(w);
    assert_eq!(stmt.sql, r#"INSERT INTO "File" ("OwnerId") VALUES (?)"#);
}

#[test]
fn test_derived_extension_on_insert() {
    let mut w = FileInserter::default();
    w.name("report.pdf");
    let stmt = statement::insert::<FileTable>(w);
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "File" ("Name", "Extension") VALUES (?, ?)"#
    );
    assert_eq!(stmt.params[1], SqlValue::Text("pdf".into()));
}

#[test]
fn test_derived_extension_without_dot() {
    let mut w = FileInserter::default();
    w.name("readme");
    let stmt = statement::insert::<FileTable>(w);
    assert_eq!(stmt.params[1], SqlValue::Text(String::new()));
}

#[test]
fn test_derived_extension_on_update() {
    let mut w = FileInserter::default();
    w.name("archive.tar.gz");
    let stmt = ok_statement(statement::update::<FileTable>(
        w,
        Some(&FileTable::file_id().eq(3)),
    ));
    assert_eq!(
        stmt.sql,
        r#"UPDATE "File" SET "Name" = ?, "Extension" = ? where ("FileId" = ?)"#
    );
    assert_eq!(stmt.params[1], SqlValue::Text("gz".into()));
}

#[test]
fn test_update_without_name_leaves_extension_alone() {
    let mut w = FileInserter::default();
    w.created(fixed_time());
    let stmt = ok_statement(statement::update::<FileTable>(w, None));
    assert_eq!(stmt.sql, r#"UPDATE "File" SET "Created" = ?"#);
}

#[test]
fn test_decode_row() {
    let owner = Uuid::from_u128(42);
    let values = vec![
        SqlValue::Text("a.txt".into()),
        SqlValue::Text("txt".into()),
        owner.to_sql_value(),
        fixed_time().to_sql_value(),
        SqlValue::Int(9),
    ];
    let row = FileTable::decode_row(values).unwrap();
    assert_eq!(
        row,
        File {
            name: "a.txt".into(),
            extension: "txt".into(),
            owner_id: Some(owner),
            created: fixed_time(),
            file_id: 9,
        }
    );
}

#[test]
fn test_decode_row_with_nulls() {
    let values = vec![SqlValue::Null; EverythingTable::COLUMNS.len()];
    let row = EverythingTable::decode_row(values).unwrap();
    assert_eq!(row.text, "");
    assert_eq!(row.int, 0);
    assert!(!row.flag);
    assert_eq!(row.id, Uuid::nil());
    assert_eq!(row.severity, Severity::Low);
    assert_eq!(row.maybe_text, None);
    assert_eq!(row.maybe_id, None);
}

#[test]
fn test_decode_row_wrong_width() {
    let err = FileTable::decode_row(vec![SqlValue::Null]).unwrap_err();
    assert_eq!(
        err,
        CoreError::ColumnCount {
            expected: 5,
            found: 1,
        }
    );
}

#[test]
fn test_shadow_table_is_foreign() {
    let cond = ShadowFileTable::name().eq("x");
    let err = statement::select::<FileTable>(&Query::filter(cond)).unwrap_err();
    assert!(matches!(err, CoreError::InvalidWhereClause { .. }));
}

#[test]
fn test_nullable_column_condition() {
    let cond = FileTable::owner_id().eq(Uuid::nil()) | FileTable::owner_id().is_null();
    let stmt = ok_statement(statement::count::<FileTable>(Some(&cond)));
    assert_eq!(
        stmt.sql,
        r#"SELECT COUNT(*) FROM "File" where (("OwnerId" = ?) OR ("OwnerId" IS NULL))"#
    );
}

#[test]
fn test_enum_column_condition() {
    let cond = EverythingTable::severity().in_list([Severity::High]);
    let stmt = ok_statement(statement::delete::<EverythingTable>(Some(&cond)));
    assert_eq!(stmt.params, vec![SqlValue::Int(1)]);
}
