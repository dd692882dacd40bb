//! Execution contracts the helpers are written against.
//!
//! The helpers never talk to a driver directly. They need a handle that can
//! run a query definition, load rows, manage a transaction and drive a
//! server-side cursor; [`AsyncPgConnection`] implements all four, and test
//! doubles can implement them in memory.
//!
//! The "no rows" sentinel is [`diesel::result::Error::NotFound`].
//!
//! [`AsyncPgConnection`]: diesel_async::AsyncPgConnection

mod model;
mod pg;

use std::future::Future;

use diesel::result::QueryResult;

pub use self::model::{Model, Relation};
use crate::query::{Query, SelectQuery};
use crate::types::{PrimaryKey, SqlValue};

/// Runs statements that do not produce rows.
pub trait Executor: Send {
    /// Executes a query definition and returns the affected-row count.
    fn execute(&mut self, query: &Query) -> impl Future<Output = QueryResult<usize>> + Send;

    /// Executes raw SQL with `?` placeholders.
    fn execute_raw(
        &mut self,
        sql: &str,
        binds: Vec<SqlValue>,
    ) -> impl Future<Output = QueryResult<usize>> + Send;
}

/// Loads rows of `M`.
pub trait Loader<M: Model>: Send {
    /// Loads every row a SELECT (or a statement with RETURNING) produces.
    fn load(&mut self, query: &Query) -> impl Future<Output = QueryResult<Vec<M>>> + Send;

    /// Counts the rows a SELECT matches, ignoring its ordering and pagination.
    fn count(&mut self, query: &SelectQuery) -> impl Future<Output = QueryResult<i64>> + Send;
}

/// Explicit transaction control.
///
/// Calling [`Transactional::begin`] inside an open transaction opens a
/// savepoint; the matching commit or rollback releases only that level.
pub trait Transactional: Send {
    /// Opens a transaction, or a savepoint when one is already open.
    fn begin(&mut self) -> impl Future<Output = QueryResult<()>> + Send;

    /// Commits the innermost open level.
    fn commit(&mut self) -> impl Future<Output = QueryResult<()>> + Send;

    /// Rolls back the innermost open level.
    fn rollback(&mut self) -> impl Future<Output = QueryResult<()>> + Send;

    /// Returns whether a transaction is open.
    fn in_transaction(&mut self) -> bool;
}

/// Server-side cursors over the primary keys of a SELECT.
///
/// Cursors are transaction-scoped; callers open a transaction first.
pub trait CursorExecutor: Transactional {
    /// Declares a `NO SCROLL` cursor named `name` over `query`.
    ///
    /// The query must select exactly one column, the key as text, aliased
    /// `cursor_key`.
    fn declare_cursor(
        &mut self,
        name: &str,
        query: &SelectQuery,
    ) -> impl Future<Output = QueryResult<()>> + Send;

    /// Fetches up to `count` keys, in cursor order.
    fn fetch_forward<K: PrimaryKey>(
        &mut self,
        name: &str,
        count: usize,
    ) -> impl Future<Output = QueryResult<Vec<K>>> + Send;

    /// Closes the cursor.
    fn close_cursor(&mut self, name: &str) -> impl Future<Output = QueryResult<()>> + Send;
}

/// The column alias server-side cursors return keys under.
pub(crate) const CURSOR_KEY_ALIAS: &str = "cursor_key";
