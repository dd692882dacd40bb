//! Application-level cursor: `key > last_key ORDER BY key LIMIT n`.

use tokio_util::sync::CancellationToken;

use super::{Select, load_or_empty};
use crate::executor::{Loader, Model};
use crate::query::{Condition, Filterable, QueryOption, SelectQuery, apply_options};
use crate::types::{OrderDir, PrimaryKey};
use crate::{PgError, TRACING_TARGET_ITERATION};

pub(super) async fn iterate<M, C, F, E>(
    select: &Select<M>,
    conn: &mut C,
    chunk_size: usize,
    cancel: &CancellationToken,
    mut callback: F,
    options: &[QueryOption<SelectQuery>],
) -> Result<(), E>
where
    M: Model,
    C: Loader<M>,
    F: AsyncFnMut(&mut C, &[M]) -> Result<bool, E>,
    E: From<PgError>,
{
    let base = select.base_query();
    if !base.order_exprs().is_empty() {
        return Err(PgError::Config(format!(
            "soft cursor cannot iterate {}: the base query is already ordered, use the native cursor",
            M::TABLE
        ))
        .into());
    }

    let Some(mut cursor) = M::Key::cursor_origin() else {
        return Err(PgError::Config(format!(
            "soft cursor cannot iterate {}: the key is not an ordered scalar, use the native cursor",
            M::TABLE
        ))
        .into());
    };

    let limit = i64::try_from(chunk_size)
        .map_err(|_| PgError::Config(format!("invalid chunk size: {chunk_size}")))?;
    let key_column = select.key_column();
    let mut chunks = 0usize;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(target: TRACING_TARGET_ITERATION, chunks, "Iteration cancelled");
            return Err(PgError::Cancelled.into());
        }

        let mut query = base.clone();
        query
            .filter(Condition::gt(key_column.clone(), cursor.to_value()))
            .order_by(OrderDir::Asc.expr(&key_column))
            .set_limit(limit);
        let query = apply_options(query, options);

        let chunk = load_or_empty(conn, query).await?;
        let Some(last) = chunk.last().map(Model::primary_key) else {
            break;
        };

        chunks += 1;
        tracing::trace!(
            target: TRACING_TARGET_ITERATION,
            chunk = chunks,
            rows = chunk.len(),
            cursor = %cursor,
            "Delivering chunk"
        );

        let next = callback(&mut *conn, chunk.as_slice()).await?;
        if !next || chunk.len() < chunk_size {
            break;
        }

        if last <= cursor {
            return Err(PgError::Unexpected(
                format!("soft cursor did not advance past {cursor} on {}", M::TABLE).into(),
            )
            .into());
        }

        cursor = last;
    }

    tracing::debug!(target: TRACING_TARGET_ITERATION, chunks, "Iteration finished");
    Ok(())
}
