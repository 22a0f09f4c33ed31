//! Lazily decoded SELECT results.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use microdb_core::{SqlValue, Statement, Table};
use sqlx::sqlite::SqliteRow;
use sqlx::Executor as _;
use tokio::sync::mpsc;

use crate::bind::{prepare, row_values};
use crate::connection::Held;
use crate::error::{Error, Result};
use crate::watchdog::{watch, Watched};

const CHANNEL_CAPACITY: usize = 32;

/// Rows of a SELECT, decoded one at a time as they are polled.
///
/// The connection lock is held until the stream ends or is dropped.
/// The stream stops after the first error.
pub struct RowStream<'a, R> {
    inner: Inner<'a, R>,
}

enum Inner<'a, R> {
    /// Rows produced by a task that owns the connection lock.
    Spawned(mpsc::Receiver<Result<R>>),
    /// Rows read through a transaction borrowed for the stream's lifetime.
    Borrowed(BoxStream<'a, Result<R>>),
}

impl<R> Unpin for RowStream<'_, R> {}

impl<R> Stream for RowStream<'_, R> {
    type Item = Result<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.get_mut().inner {
            Inner::Spawned(rows) => rows.poll_recv(cx),
            Inner::Borrowed(rows) => rows.as_mut().poll_next(cx),
        }
    }
}

impl<R> std::fmt::Debug for RowStream<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            Inner::Spawned(_) => "spawned",
            Inner::Borrowed(_) => "borrowed",
        };
        f.debug_struct("RowStream").field("kind", &kind).finish()
    }
}

fn decode<T: Table>(sql: &str, row: std::result::Result<SqliteRow, sqlx::Error>) -> Result<T::Row> {
    let row = row.map_err(|e| Error::query(sql, e))?;
    let values = row_values(&row).map_err(|e| Error::query(sql, e))?;
    Ok(T::decode_row(values)?)
}

/// Streams a SELECT from a background task that owns `held`.
pub(crate) fn spawned<T: Table>(mut held: Held, statement: Statement) -> RowStream<'static, T::Row> {
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let Statement { sql, params } = statement;
        let shared = Arc::clone(held.shared());
        let abandoned = {
            let conn = match held.conn() {
                Ok(conn) => conn,
                Err(e) => {
                    let _ = sender.send(Err(e)).await;
                    return;
                }
            };
            let mut rows = conn.fetch(prepare(&sql, params));
            loop {
                match watch(shared.config(), &sql, rows.next()).await {
                    Watched::Done(Some(row)) => {
                        let item = decode::<T>(&sql, row);
                        let failed = item.is_err();
                        if sender.send(item).await.is_err() || failed {
                            break None;
                        }
                    }
                    Watched::Done(None) => break None,
                    Watched::Abandoned(elapsed) => break Some(elapsed),
                }
            }
        };
        if let Some(elapsed) = abandoned {
            let _ = sender.send(Err(held.abandon(elapsed))).await;
        }
    });

    RowStream {
        inner: Inner::Spawned(receiver),
    }
}

/// Streams a SELECT through a connection already held by a transaction.
pub(crate) fn borrowed<'a, T: Table>(
    held: &'a mut Held,
    sql: &'a str,
    params: Vec<SqlValue>,
) -> Result<RowStream<'a, T::Row>> {
    let shared = Arc::clone(held.shared());
    let rows = held.conn()?.fetch(prepare(sql, params));

    let stream = futures::stream::unfold(Some((rows, shared)), move |state| async move {
        let (mut rows, shared) = state?;
        match watch(shared.config(), sql, rows.next()).await {
            Watched::Done(Some(row)) => {
                let item = decode::<T>(sql, row);
                let next = item.is_ok().then_some((rows, shared));
                Some((item, next))
            }
            Watched::Done(None) => None,
            Watched::Abandoned(elapsed) => Some((Err(shared.poison(elapsed)), None)),
        }
    });

    Ok(RowStream {
        inner: Inner::Borrowed(stream.boxed()),
    })
}
