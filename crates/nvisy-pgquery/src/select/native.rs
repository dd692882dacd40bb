//! Server-side cursor over primary keys, one model query per batch of keys.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{Select, load_or_empty};
use crate::executor::{CURSOR_KEY_ALIAS, CursorExecutor, Loader, Model};
use crate::expect::expect_success;
use crate::query::{Condition, Filterable, QueryOption, SelectQuery, apply_options};
use crate::types::{OrderDir, PrimaryKey};
use crate::{PgError, TRACING_TARGET_ITERATION};

pub(super) async fn iterate<M, C, F, E>(
    select: &Select<M>,
    conn: &mut C,
    chunk_size: usize,
    cancel: &CancellationToken,
    callback: F,
    options: &[QueryOption<SelectQuery>],
) -> Result<(), E>
where
    M: Model,
    C: Loader<M> + CursorExecutor,
    F: AsyncFnMut(&mut C, &[M]) -> Result<bool, E>,
    E: From<PgError>,
{
    let cursor = format!("select_cursor_{}", Uuid::new_v4().simple());
    let nested = conn.in_transaction();
    expect_success(conn.begin().await)?;

    tracing::debug!(
        target: TRACING_TARGET_ITERATION,
        cursor = %cursor,
        nested,
        "Opened cursor transaction"
    );

    let result = walk(select, conn, &cursor, chunk_size, cancel, callback, options).await;
    match result {
        Ok(()) => {
            expect_success(conn.commit().await)?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = conn.rollback().await {
                tracing::error!(
                    target: TRACING_TARGET_ITERATION,
                    cursor = %cursor,
                    error = %rollback_err,
                    "Failed to roll back cursor transaction"
                );
            }
            Err(err)
        }
    }
}

async fn walk<M, C, F, E>(
    select: &Select<M>,
    conn: &mut C,
    cursor: &str,
    chunk_size: usize,
    cancel: &CancellationToken,
    mut callback: F,
    options: &[QueryOption<SelectQuery>],
) -> Result<(), E>
where
    M: Model,
    C: Loader<M> + CursorExecutor,
    F: AsyncFnMut(&mut C, &[M]) -> Result<bool, E>,
    E: From<PgError>,
{
    let key_column = select.key_column();

    let mut keys_query = select.base_query();
    if keys_query.order_exprs().is_empty() {
        keys_query.order_by(OrderDir::Asc.expr(&key_column));
    }
    keys_query.set_column_expr(format!("({key_column})::text AS {CURSOR_KEY_ALIAS}"));
    expect_success(conn.declare_cursor(cursor, &keys_query).await)?;

    let mut chunks = 0usize;
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(target: TRACING_TARGET_ITERATION, chunks, "Iteration cancelled");
            return Err(PgError::Cancelled.into());
        }

        let keys = match expect_success(conn.fetch_forward::<M::Key>(cursor, chunk_size).await) {
            Ok(keys) => keys,
            Err(err) if err.is_affected_rows() => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        if keys.is_empty() {
            break;
        }

        let mut query = select.base_query();
        query.filter(Condition::any_of(key_column.clone(), M::Key::to_array(&keys)));
        let query = apply_options(query, options);

        let rows = load_or_empty(conn, query).await?;
        if rows.is_empty() {
            // Rows can disappear between FETCH and the model query when the
            // cursor does not lock them.
            tracing::warn!(
                target: TRACING_TARGET_ITERATION,
                cursor,
                keys = keys.len(),
                "Fetched keys matched no rows, ending iteration"
            );
            break;
        }

        let chunk = in_cursor_order(&keys, rows);
        chunks += 1;
        tracing::trace!(
            target: TRACING_TARGET_ITERATION,
            chunk = chunks,
            keys = keys.len(),
            rows = chunk.len(),
            "Delivering chunk"
        );

        let next = callback(&mut *conn, chunk.as_slice()).await?;
        if !next || keys.len() < chunk_size {
            break;
        }
    }

    expect_success(conn.close_cursor(cursor).await)?;
    tracing::debug!(target: TRACING_TARGET_ITERATION, chunks, "Iteration finished");
    Ok(())
}

/// Reorders `rows` to follow `keys`; rows without a matching key go last.
///
/// Keys are matched on their text form, which also covers float keys.
fn in_cursor_order<M: Model>(keys: &[M::Key], rows: Vec<M>) -> Vec<M> {
    let positions: HashMap<String, usize> = keys
        .iter()
        .enumerate()
        .map(|(position, key)| (key.to_string(), position))
        .collect();

    let mut slots: Vec<Option<M>> = Vec::new();
    slots.resize_with(keys.len(), || None);
    let mut unmatched = Vec::new();

    for row in rows {
        match positions.get(&row.primary_key().to_string()) {
            Some(&position) if slots[position].is_none() => slots[position] = Some(row),
            _ => unmatched.push(row),
        }
    }

    let mut ordered: Vec<M> = slots.into_iter().flatten().collect();
    ordered.extend(unmatched);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PgResult;
    use crate::executor::Transactional;
    use crate::select::IterStrategy;
    use crate::testing::{FakeDb, Token, Widget, widgets};

    fn native() -> Select<Widget> {
        Select::new().with_strategy(IterStrategy::NativeCursor)
    }

    fn by_name_desc() -> SelectQuery {
        let mut query = SelectQuery::for_model::<Widget>();
        query.order_by(r#""widgets"."name" DESC"#);
        query
    }

    #[tokio::test]
    async fn runs_inside_one_transaction() {
        let mut db = FakeDb::new(widgets(1..=5));
        let mut chunks = Vec::new();

        native()
            .iterate(
                &mut db,
                2,
                async |db: &mut FakeDb<Widget>, chunk: &[Widget]| {
                    assert!(db.in_transaction());
                    chunks.push(chunk.iter().map(|w| w.id).collect::<Vec<_>>());
                    Ok::<_, PgError>(true)
                },
                &[],
            )
            .await
            .unwrap();

        assert_eq!(chunks, [vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(db.depth(), 0);

        let cursor = db.events[1].trim_start_matches("declare ").to_owned();
        assert!(cursor.starts_with("select_cursor_"));
        assert_eq!(
            db.events,
            [
                "begin".to_owned(),
                format!("declare {cursor}"),
                "fetch 2".to_owned(),
                "load".to_owned(),
                "fetch 2".to_owned(),
                "load".to_owned(),
                "fetch 2".to_owned(),
                "load".to_owned(),
                "close".to_owned(),
                "commit".to_owned(),
            ]
        );
        assert_eq!(
            db.statements[0],
            concat!(
                r#"SELECT ("widgets"."id")::text AS cursor_key FROM "widgets""#,
                r#" WHERE "widgets"."deleted_at" IS NULL ORDER BY "widgets"."id" ASC"#
            )
        );
        assert!(db.statements[1].contains(r#""widgets"."id" = ANY($1)"#));
    }

    #[tokio::test]
    async fn cursor_names_are_unique_per_call() {
        let mut db = FakeDb::new(widgets(1..=2));
        for _ in 0..2 {
            native()
                .iterate(&mut db, 5, async |_, _| Ok::<_, PgError>(true), &[])
                .await
                .unwrap();
        }

        let declared: Vec<&String> = db.events.iter().filter(|e| e.starts_with("declare")).collect();
        assert_eq!(declared.len(), 2);
        assert_ne!(declared[0], declared[1]);
    }

    #[tokio::test]
    async fn chunks_follow_the_cursor_order() {
        let mut db = FakeDb::new(widgets(1..=5));
        let mut seen = Vec::new();

        native()
            .with_query(by_name_desc)
            .iterate(
                &mut db,
                2,
                async |_, chunk: &[Widget]| {
                    seen.extend(chunk.iter().map(|w| w.id));
                    Ok::<_, PgError>(true)
                },
                &[],
            )
            .await
            .unwrap();

        assert_eq!(seen, [5, 4, 3, 2, 1]);
        assert!(db.statements[0].ends_with(r#"ORDER BY "widgets"."name" DESC"#));
    }

    #[tokio::test]
    async fn opaque_keys_are_supported() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut db = FakeDb::new(ids.iter().map(|&id| Token { id }).collect());
        let mut seen = Vec::new();

        Select::<Token>::new()
            .with_strategy(IterStrategy::NativeCursor)
            .iterate(
                &mut db,
                2,
                async |_, chunk: &[Token]| {
                    seen.extend(chunk.iter().map(|t| t.id));
                    Ok::<_, PgError>(true)
                },
                &[],
            )
            .await
            .unwrap();

        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn vanished_rows_end_iteration_quietly() {
        let mut db = FakeDb::new(widgets(1..=5));
        db.hide_fetched_rows = true;
        let mut calls = 0;

        native()
            .iterate(
                &mut db,
                2,
                async |_, _| {
                    calls += 1;
                    Ok::<_, PgError>(true)
                },
                &[],
            )
            .await
            .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(db.events.last().map(String::as_str), Some("commit"));
    }

    #[tokio::test]
    async fn callback_error_rolls_back() {
        let mut db = FakeDb::new(widgets(1..=5));
        let result: PgResult<()> = native()
            .iterate(
                &mut db,
                2,
                async |_, _| Err(PgError::Unexpected("callback failed".into())),
                &[],
            )
            .await;

        assert!(matches!(result, Err(PgError::Unexpected(_))));
        assert_eq!(db.count_events("commit"), 0);
        assert_eq!(db.events.last().map(String::as_str), Some("rollback"));
        assert_eq!(db.depth(), 0);
    }

    #[tokio::test]
    async fn error_on_second_chunk_is_returned_verbatim() {
        #[derive(Debug, PartialEq)]
        enum JobError {
            Db(String),
            Rejected(Vec<i64>),
        }

        impl From<PgError> for JobError {
            fn from(err: PgError) -> Self {
                JobError::Db(err.to_string())
            }
        }

        let mut db = FakeDb::new(widgets(1..=10));
        let mut calls = 0;

        let err = native()
            .iterate(
                &mut db,
                2,
                async |_, chunk: &[Widget]| {
                    calls += 1;
                    if calls == 2 {
                        return Err(JobError::Rejected(chunk.iter().map(|w| w.id).collect()));
                    }
                    Ok(true)
                },
                &[],
            )
            .await
            .unwrap_err();

        assert_eq!(err, JobError::Rejected(vec![3, 4]));
        assert_eq!(calls, 2);
        assert_eq!(db.count_events("fetch"), 2);
        assert_eq!(db.count_events("close"), 0);
        assert_eq!(db.count_events("commit"), 0);
        assert_eq!(db.events.last().map(String::as_str), Some("rollback"));
        assert_eq!(db.depth(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_rolls_back() {
        let mut db = FakeDb::new(widgets(1..=5));
        db.fail_on = Some("fetch");

        let err: PgError = native()
            .iterate(&mut db, 2, async |_, _| Ok(true), &[])
            .await
            .unwrap_err();

        assert!(err.is_query_execution());
        assert_eq!(db.events.last().map(String::as_str), Some("rollback"));
    }

    #[tokio::test]
    async fn commit_failure_is_reported() {
        let mut db = FakeDb::new(widgets(1..=3));
        db.fail_on = Some("commit");

        let err: PgError = native()
            .iterate(&mut db, 5, async |_, _| Ok(true), &[])
            .await
            .unwrap_err();

        assert!(err.is_query_execution());
    }

    #[tokio::test]
    async fn stop_request_still_commits() {
        let mut db = FakeDb::new(widgets(1..=10));
        let mut calls = 0;

        native()
            .iterate(
                &mut db,
                3,
                async |_, _| {
                    calls += 1;
                    Ok::<_, PgError>(false)
                },
                &[],
            )
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(db.count_events("fetch"), 1);
        assert_eq!(db.events.last().map(String::as_str), Some("commit"));
    }

    #[tokio::test]
    async fn nests_inside_an_open_transaction() {
        let mut db = FakeDb::new(widgets(1..=3));
        db.begin().await.unwrap();

        native()
            .iterate(&mut db, 5, async |_, _| Ok::<_, PgError>(true), &[])
            .await
            .unwrap();

        assert_eq!(db.depth(), 1);
    }

    #[tokio::test]
    async fn cancellation_rolls_back() {
        let mut db = FakeDb::new(widgets(1..=10));
        let cancel = CancellationToken::new();

        let result: PgResult<()> = native()
            .iterate_with_cancellation(
                &mut db,
                2,
                &cancel,
                async |_, _| {
                    cancel.cancel();
                    Ok(true)
                },
                &[],
            )
            .await;

        assert!(matches!(result, Err(PgError::Cancelled)));
        assert_eq!(db.events.last().map(String::as_str), Some("rollback"));
    }

    #[test]
    fn reorders_rows_into_key_order() {
        let rows = widgets([1, 2, 3]);
        let ordered = in_cursor_order::<Widget>(&[3, 1, 2], rows);
        assert_eq!(ordered.iter().map(|w| w.id).collect::<Vec<_>>(), [3, 1, 2]);

        let ordered = in_cursor_order::<Widget>(&[2], widgets([1, 2]));
        assert_eq!(ordered.iter().map(|w| w.id).collect::<Vec<_>>(), [2, 1]);
    }

    #[test]
    fn reorders_a_large_reversed_batch() {
        let keys: Vec<i64> = (1..=50_000).rev().collect();
        let ordered = in_cursor_order::<Widget>(&keys, widgets(1..=50_000));

        assert_eq!(ordered.len(), keys.len());
        assert!(ordered.iter().map(|w| w.id).eq(keys.iter().copied()));
    }
}
