//! Typed statements through a connection.

mod common;

use common::*;
use futures::StreamExt;
use microdb::{ColumnExt, CoreError, Error, Query, SortOrder};
use uuid::Uuid;

#[tokio::test]
async fn test_insert_and_select_single() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    add_pair(&conn, "theme", "dark").await;

    let mut pairs = conn.table::<PairTable>();
    let found = pairs
        .select_single(Some(PairTable::name().eq("theme")))
        .await
        .unwrap();
    assert_eq!(
        found,
        Some(Pair {
            name: "theme".into(),
            value: "dark".into(),
        })
    );
    let missing = pairs
        .select_single(Some(PairTable::name().eq("font")))
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_select_single_rejects_many() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    add_pair(&conn, "a", "1").await;
    add_pair(&conn, "b", "1").await;

    let err = conn
        .table::<PairTable>()
        .select_single(Some(PairTable::value().eq("1")))
        .await
        .unwrap_err();
    match err {
        Error::Query { message, source } => {
            assert!(message.contains("more than one"));
            assert!(source.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_update_and_delete_return_counts() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    for name in ["ui.theme", "ui.font", "net.proxy"] {
        add_pair(&conn, name, "old").await;
    }

    let mut pairs = conn.table::<PairTable>();
    let updated = pairs
        .update(Some(PairTable::name().like("ui.%")), |w| {
            w.value("new");
        })
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        pairs
            .count(Some(PairTable::value().eq("new")))
            .await
            .unwrap(),
        2
    );

    let deleted = pairs
        .delete(Some(PairTable::value().not_eq("new")))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(pairs.delete(None).await.unwrap(), 2);
    assert_eq!(pairs.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    let err = conn
        .table::<PairTable>()
        .update(None, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Core(CoreError::EmptyUpdate { .. })));
}

#[tokio::test]
async fn test_primary_key_conflict_is_a_query_error() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    add_pair(&conn, "dup", "1").await;
    let err = conn
        .table::<PairTable>()
        .insert(|w| {
            w.name("dup").value("2");
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Query { source: Some(_), .. }));
}

#[tokio::test]
async fn test_insert_returns_generated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    let first = add_note(&conn, "one").await;
    let second = add_note(&conn, "two").await;
    assert_eq!(second, first + 1);

    let note = conn
        .table::<NoteTable>()
        .select_single(Some(NoteTable::note_id().eq(second)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(note.body, "two");
    assert_eq!(note.created, fixed_time());
    assert_eq!(note.author, None);
    assert!(!note.pinned);
}

#[tokio::test]
async fn test_nullable_and_bool_columns() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    let author = Uuid::from_u128(0xfeed);
    let mut notes = conn.table::<NoteTable>();
    notes
        .insert(|w| {
            w.body("signed").created(fixed_time()).author(author).pinned(true);
        })
        .await
        .unwrap();
    add_note(&conn, "anonymous").await;

    let mut notes = conn.table::<NoteTable>();
    let signed = notes
        .select_vec(Query::filter(NoteTable::author().is_not_null()))
        .await
        .unwrap();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].author, Some(author));
    assert!(signed[0].pinned);

    let anonymous = notes
        .count(Some(NoteTable::author().is_null() & !NoteTable::pinned().eq(true)))
        .await
        .unwrap();
    assert_eq!(anonymous, 1);
}

#[tokio::test]
async fn test_ordered_limited_select() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    for name in ["b", "d", "a", "c"] {
        add_pair(&conn, name, "v").await;
    }

    let rows = conn
        .table::<PairTable>()
        .select_vec(
            Query::all()
                .order_by(PairTable::name())
                .sort(SortOrder::Desc)
                .max(3),
        )
        .await
        .unwrap();
    let names: Vec<_> = rows.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["d", "c", "b"]);
}

#[tokio::test]
async fn test_foreign_condition_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    add_pair(&conn, "x", "y").await;
    let foreign = || Some(NoteTable::body().eq("x"));
    let mut pairs = conn.table::<PairTable>();

    let err = pairs.select_vec(Query::all().with_condition(foreign())).await.unwrap_err();
    assert!(err.is_invalid_where_clause());

    let err = pairs.select_single(foreign()).await.unwrap_err();
    assert!(err.is_invalid_where_clause());

    let err = pairs.count(foreign()).await.unwrap_err();
    assert!(err.is_invalid_where_clause());

    let err = pairs
        .update(foreign(), |w| {
            w.value("z");
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid_where_clause());

    let err = pairs.delete(foreign()).await.unwrap_err();
    assert!(err.is_invalid_where_clause());

    // Nothing reached the file.
    let pair = pairs
        .select_single(Some(PairTable::name().eq("x")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pair.value, "y");
}

#[tokio::test]
async fn test_dropped_stream_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    for i in 0..100 {
        add_pair(&conn, &format!("k{i:03}"), "v").await;
    }

    let mut rows = conn.table::<PairTable>().select(Query::all()).await.unwrap();
    let first = rows.next().await.unwrap().unwrap();
    assert_eq!(first.value, "v");
    drop(rows);

    add_pair(&conn, "after", "v").await;
    assert_eq!(conn.table::<PairTable>().count(None).await.unwrap(), 101);
}

#[tokio::test]
async fn test_writes_are_announced() {
    let dir = tempfile::tempdir().unwrap();
    let conn = fresh(&dir).await;
    let mut written = conn.subscribe();

    add_pair(&conn, "a", "b").await;
    let event = written.recv().await.unwrap();
    assert_eq!(event.path, db_path(&dir));

    conn.table::<PairTable>().select_all().await.unwrap();
    assert!(written.try_recv().is_err());
}
