//! Bulk retrieval, pagination and chunked iteration over one model.
//!
//! [`Select`] walks a possibly unbounded result set in chunks, handing each
//! chunk to a callback. Two strategies are available:
//!
//! - [`IterStrategy::SoftCursor`] filters `key > last_key`, orders by key and
//!   limits each statement. One round-trip per chunk, no transaction, but the
//!   base query must not impose its own ordering and the key must be an
//!   ordered scalar.
//! - [`IterStrategy::NativeCursor`] declares a server-side cursor over the
//!   keys inside a transaction, then loads the models of each batch of keys.
//!   Two round-trips per chunk, in exchange for arbitrary ordering, grouping
//!   and opaque keys. Prefer large chunks with this strategy.
//!
//! Iteration stops on an empty chunk, on a chunk shorter than the chunk
//! size, when the callback returns `false`, or on the first error.

mod native;
mod soft;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs, EnumString};
use tokio_util::sync::CancellationToken;

use crate::executor::{CursorExecutor, Loader, Model};
use crate::expect::expect_success;
use crate::query::{Query, QueryOption, SelectQuery, apply_options, paginate as page_option};
use crate::types::{PaginatedPage, Pagination};
use crate::{PgError, PgResult, TRACING_TARGET_ITERATION, TRACING_TARGET_QUERY};

/// How [`Select::iterate`] moves through the result set.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIs, EnumString)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IterStrategy {
    /// Application-level cursor over an ordered scalar key.
    #[default]
    SoftCursor,

    /// Server-side `DECLARE ... CURSOR` inside a transaction.
    NativeCursor,
}

type BuildQuery = Arc<dyn Fn() -> SelectQuery + Send + Sync>;

/// Retrieval helpers for the rows of `M`.
///
/// The base query defaults to every visible row of `M`. A custom base query
/// should not carry OFFSET/LIMIT or relations; apply those per call through
/// options instead. With a grouped or aggregated base query, point
/// [`Select::with_key_column`] at the column to iterate by.
pub struct Select<M: Model> {
    strategy: IterStrategy,
    key_column: Option<String>,
    build_query: Option<BuildQuery>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Select<M> {
    /// Creates a selector over every row of `M` using the soft cursor.
    pub fn new() -> Self {
        Self {
            strategy: IterStrategy::default(),
            key_column: None,
            build_query: None,
            _model: PhantomData,
        }
    }

    /// Sets the iteration strategy.
    pub fn with_strategy(mut self, strategy: IterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the key column expression, `"table"."id"` by default.
    pub fn with_key_column(mut self, expr: impl Into<String>) -> Self {
        self.key_column = Some(expr.into());
        self
    }

    /// Overrides the base query every statement starts from.
    pub fn with_query<F>(mut self, build: F) -> Self
    where
        F: Fn() -> SelectQuery + Send + Sync + 'static,
    {
        self.build_query = Some(Arc::new(build));
        self
    }

    /// Returns the iteration strategy.
    #[inline]
    pub fn strategy(&self) -> IterStrategy {
        self.strategy
    }

    /// Returns the key column expression.
    pub fn key_column(&self) -> String {
        match &self.key_column {
            Some(expr) => expr.clone(),
            None => SelectQuery::new(M::TABLE).qualify(M::PRIMARY_KEY),
        }
    }

    /// Builds a fresh base query.
    pub fn base_query(&self) -> SelectQuery {
        match &self.build_query {
            Some(build) => build(),
            None => SelectQuery::for_model::<M>(),
        }
    }

    /// Loads every matching row in one statement.
    ///
    /// A "no rows" result is an empty vector, not an error.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_QUERY, fields(table = M::TABLE))]
    pub async fn all<C>(&self, conn: &mut C, options: &[QueryOption<SelectQuery>]) -> PgResult<Vec<M>>
    where
        C: Loader<M>,
    {
        let query = apply_options(self.base_query(), options);
        load_or_empty(conn, query).await
    }

    /// Loads one page of rows together with the total number of matches.
    ///
    /// `page` is 1-based. The page's offset and limit are applied before
    /// `options`. A "no rows" result folds into an empty page whose
    /// effective page is 1.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Config`] when `page` or `per_page` is zero.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_QUERY, fields(table = M::TABLE, page = page, per_page = per_page))]
    pub async fn paginate<C>(
        &self,
        conn: &mut C,
        page: u64,
        per_page: u64,
        options: &[QueryOption<SelectQuery>],
    ) -> PgResult<PaginatedPage<M>>
    where
        C: Loader<M>,
    {
        let pagination = Pagination::new(page, per_page)?;

        let mut query = self.base_query();
        page_option(pagination).apply(&mut query);
        let query = apply_options(query, options);

        let items = load_or_empty(conn, query.clone()).await?;
        let total = match expect_success(conn.count(&query).await) {
            Ok(total) => total,
            Err(err) if err.is_affected_rows() => 0,
            Err(err) => return Err(err),
        };

        let total = u64::try_from(total)
            .map_err(|_| PgError::Unexpected(format!("negative row count: {total}").into()))?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            total,
            rows = items.len(),
            "Loaded page"
        );

        Ok(PaginatedPage::new(&pagination, total, items))
    }

    /// Walks every matching row in chunks of at most `chunk_size`.
    ///
    /// `callback` receives the connection and the current chunk and returns
    /// whether to continue. Its errors are returned unchanged. Options apply
    /// to every per-chunk model query.
    ///
    /// # Errors
    ///
    /// - [`PgError::Config`] for a zero `chunk_size` or a strategy that cannot
    ///   serve the base query or key type
    /// - [`PgError::Query`] when a statement fails
    /// - whatever the callback returns
    pub async fn iterate<C, F, E>(
        &self,
        conn: &mut C,
        chunk_size: usize,
        callback: F,
        options: &[QueryOption<SelectQuery>],
    ) -> Result<(), E>
    where
        C: Loader<M> + CursorExecutor,
        F: AsyncFnMut(&mut C, &[M]) -> Result<bool, E>,
        E: From<PgError>,
    {
        let cancel = CancellationToken::new();
        self.iterate_with_cancellation(conn, chunk_size, &cancel, callback, options)
            .await
    }

    /// Like [`Select::iterate`], checking `cancel` before every chunk.
    ///
    /// A cancelled native-cursor iteration rolls its transaction back.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Cancelled`] once the token has fired.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_ITERATION,
        fields(table = M::TABLE, strategy = %self.strategy, chunk_size = chunk_size)
    )]
    pub async fn iterate_with_cancellation<C, F, E>(
        &self,
        conn: &mut C,
        chunk_size: usize,
        cancel: &CancellationToken,
        callback: F,
        options: &[QueryOption<SelectQuery>],
    ) -> Result<(), E>
    where
        C: Loader<M> + CursorExecutor,
        F: AsyncFnMut(&mut C, &[M]) -> Result<bool, E>,
        E: From<PgError>,
    {
        if chunk_size < 1 {
            return Err(PgError::Config(format!("invalid chunk size: {chunk_size}")).into());
        }

        match self.strategy {
            IterStrategy::SoftCursor => {
                soft::iterate(self, conn, chunk_size, cancel, callback, options).await
            }
            IterStrategy::NativeCursor => {
                native::iterate(self, conn, chunk_size, cancel, callback, options).await
            }
        }
    }
}

impl<M: Model> Default for Select<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Select<M> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            key_column: self.key_column.clone(),
            build_query: self.build_query.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Select<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("table", &M::TABLE)
            .field("strategy", &self.strategy)
            .field("key_column", &self.key_column())
            .field("custom_query", &self.build_query.is_some())
            .finish()
    }
}

/// Loads rows, folding "no rows" into an empty vector.
async fn load_or_empty<M, C>(conn: &mut C, query: SelectQuery) -> PgResult<Vec<M>>
where
    M: Model,
    C: Loader<M>,
{
    match expect_success(conn.load(&Query::Select(query)).await) {
        Ok(rows) => Ok(rows),
        Err(err) if err.is_affected_rows() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}
