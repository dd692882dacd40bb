//! Error types and utilities for database operations.
//!
//! Callers receive a small, closed set of error kinds: affected-rows
//! mismatches, query execution failures, unknowable row counts,
//! configuration errors, cancellation, and pool-level failures.

use std::borrow::Cow;

use deadpool::managed::TimeoutType;
use diesel::result::{ConnectionError, Error};
use diesel_async::pooled_connection::PoolError as DieselPoolError;
use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;

use crate::types::AffectedOp;

/// Type-erased error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The number of affected rows failed a comparison against an expected count.
///
/// Constructed at the point of mismatch and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("affected rows: {actual} (must be {op} {expected})")]
pub struct AffectedRowsError {
    actual: i64,
    expected: i64,
    op: AffectedOp,
}

impl AffectedRowsError {
    /// Creates a new mismatch for the given comparison.
    pub fn new(expected: i64, actual: i64, op: AffectedOp) -> Self {
        Self {
            actual,
            expected,
            op,
        }
    }

    /// Returns the number of rows that were actually affected.
    #[inline]
    pub fn actual(&self) -> i64 {
        self.actual
    }

    /// Returns the count the caller expected.
    #[inline]
    pub fn expected(&self) -> i64 {
        self.expected
    }

    /// Returns the comparison that failed.
    #[inline]
    pub fn op(&self) -> AffectedOp {
        self.op
    }
}

/// Comprehensive error type for all PostgreSQL database operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Configuration error.
    ///
    /// This includes invalid pool settings, a non-positive chunk size,
    /// invalid pagination input, or an iteration strategy that cannot serve
    /// the given model.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation timed out while waiting on the connection pool.
    #[error("Database operation timed out")]
    Timeout(TimeoutType),

    /// Failed to establish or maintain a database connection.
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The affected row count did not satisfy the expectation.
    ///
    /// A "no rows" result is reported as this kind with `actual == 0`.
    #[error(transparent)]
    AffectedRows(#[from] AffectedRowsError),

    /// Query execution failed for any reason other than "no rows".
    ///
    /// The original diesel error is kept as the source.
    #[error("Query execution error: {0}")]
    Query(#[source] Error),

    /// The statement succeeded but the backend could not report how many
    /// rows it affected.
    #[error("Failed to get affected rows: {0}")]
    RowsAffected(#[source] BoxError),

    /// The operation was cancelled before the next statement was issued.
    #[error("Database operation cancelled")]
    Cancelled,

    /// Unexpected error occurred.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Wraps an execution failure.
    ///
    /// Prefer [`expect_success`] when the error may be the "no rows" sentinel.
    ///
    /// [`expect_success`]: crate::expect_success
    #[inline]
    pub fn query(error: Error) -> Self {
        Self::Query(error)
    }

    /// Returns whether this error is an affected-rows mismatch.
    #[inline]
    pub fn is_affected_rows(&self) -> bool {
        matches!(self, PgError::AffectedRows(_))
    }

    /// Returns whether this error wraps a query execution failure.
    #[inline]
    pub fn is_query_execution(&self) -> bool {
        matches!(self, PgError::Query(_))
    }

    /// Returns the affected-rows mismatch, if this is one.
    pub fn affected_rows(&self) -> Option<&AffectedRowsError> {
        match self {
            PgError::AffectedRows(err) => Some(err),
            _ => None,
        }
    }

    /// Returns whether this error indicates a transient failure that might succeed on retry.
    ///
    /// Nothing in this crate retries; the classification is for callers.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PgError::Timeout(_) | PgError::Connection(ConnectionError::BadConnection(_))
        )
    }
}

impl From<DeadpoolError> for PgError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => {
                tracing::warn!("Unexpected post-create hook error: {}", err);
                Self::Unexpected(err.to_string().into())
            }
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!("No tokio runtime specified for connection pool");
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => Self::Connection(ConnectionError::InvalidConnectionUrl(
                "Connection pool is closed".into(),
            )),
        }
    }
}

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;
