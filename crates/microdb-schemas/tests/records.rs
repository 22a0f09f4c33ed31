mod common;

use chrono::Duration;
use common::{db_path, fixed_time};
use microdb::{ColumnExt, Query, SortOrder};
use microdb_schemas::log::{ClassTable, LifespanTable, LogEntryTable, LoggingLevel};
use microdb_schemas::session_manager::SessionTable;
use microdb_schemas::user_manager::UserTable;
use microdb_schemas::SchemaKind;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

#[tokio::test]
async fn test_create_every_schema() {
    let dir = tempfile::tempdir().unwrap();
    for kind in SchemaKind::ALL {
        let connector = kind.connector(db_path(&dir, &kind.to_string()));
        assert_ok!(connector.create().await);
        assert_eq!(
            connector.stored_version().await.unwrap(),
            kind.definition().target_version
        );
        assert_err!(connector.create().await);
        assert!(connector.upgrade().await.unwrap().is_noop());
    }
}

#[tokio::test]
async fn test_log_entries_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let conn = SchemaKind::Log
        .connector(db_path(&dir, "log"))
        .open_or_create()
        .await
        .unwrap();

    let class_id: i64 = conn
        .table::<ClassTable>()
        .insert_and_return_primary_key(|w| {
            w.name("Server.Http");
        })
        .await
        .unwrap();

    let session = Uuid::new_v4();
    for (level, message) in [
        (LoggingLevel::Info, "Listening"),
        (LoggingLevel::Error, "Connection reset"),
    ] {
        conn.table::<LogEntryTable>()
            .insert(|w| {
                w.class_id(class_id)
                    .time_stamp(fixed_time())
                    .level(level)
                    .thread_id(7)
                    .session_id(Some(session))
                    .message(message);
            })
            .await
            .unwrap();
    }

    let entries = conn
        .table::<LogEntryTable>()
        .select_vec(
            Query::filter(LogEntryTable::level().gt_eq(LoggingLevel::Warn))
                .order_by(LogEntryTable::time_stamp())
                .sort(SortOrder::Desc),
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.message, "Connection reset");
    assert_eq!(entry.session_id, Some(session));
    assert_eq!(entry.user_id, None);
    assert_eq!(entry.exception_class_id, None);
    assert_eq!(entry.exception_stack_trace, None);

    conn.table::<LifespanTable>()
        .insert(|w| {
            w.level(LoggingLevel::Trace).timespan(Duration::days(7));
        })
        .await
        .unwrap();
    let lifespan = conn
        .table::<LifespanTable>()
        .select_single(Some(LifespanTable::level().eq(LoggingLevel::Trace)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lifespan.timespan, Duration::days(7));
}

#[tokio::test]
async fn test_sessions_expire_by_time() {
    let dir = tempfile::tempdir().unwrap();
    let conn = SchemaKind::SessionManager
        .connector(db_path(&dir, "sessions"))
        .open_or_create()
        .await
        .unwrap();

    let user = Uuid::new_v4();
    let short = Uuid::new_v4();
    let long = Uuid::new_v4();
    for (session, max_age, keep_alive) in [
        (short, Duration::minutes(20), false),
        (long, Duration::days(30), true),
    ] {
        conn.table::<SessionTable>()
            .insert(|w| {
                w.session_id(session)
                    .user_id(user)
                    .max_age(max_age)
                    .when_to_delete(fixed_time() + max_age)
                    .keep_alive(keep_alive);
            })
            .await
            .unwrap();
    }

    let purged = conn
        .table::<SessionTable>()
        .delete(Some(
            SessionTable::when_to_delete().lt(fixed_time() + Duration::hours(1)),
        ))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    let remaining = conn.table::<SessionTable>().select_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].session_id, long);
    assert_eq!(remaining[0].max_age, Duration::days(30));
    assert!(remaining[0].keep_alive);
}

#[tokio::test]
async fn test_user_names_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let conn = SchemaKind::UserManager
        .connector(db_path(&dir, "users"))
        .open_or_create()
        .await
        .unwrap();

    let add = |id: Uuid| {
        let conn = conn.clone();
        async move {
            conn.table::<UserTable>()
                .insert(|w| {
                    w.name("admin").id(id).password_hash("x").built_in(true);
                })
                .await
        }
    };
    assert_ok!(add(Uuid::new_v4()).await);
    assert_err!(add(Uuid::new_v4()).await);
    assert_eq!(
        conn.table::<UserTable>()
            .count(Some(UserTable::built_in().eq(true)))
            .await
            .unwrap(),
        1
    );
}
