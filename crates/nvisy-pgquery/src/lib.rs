#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for client-related operations.
///
/// Use this target for logging client initialization, configuration, and lifecycle events.
pub const TRACING_TARGET_CLIENT: &str = "nvisy_pgquery::client";

/// Tracing target for database connection operations.
///
/// Use this target for logging connection establishment, pool management, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "nvisy_pgquery::connection";

/// Tracing target for statement execution and result assertions.
pub const TRACING_TARGET_QUERY: &str = "nvisy_pgquery::queries";

/// Tracing target for chunked iteration.
///
/// Use this target for logging cursor movement, chunk delivery, and iteration termination.
pub const TRACING_TARGET_ITERATION: &str = "nvisy_pgquery::iteration";

/// Tracing target for advisory locks.
pub const TRACING_TARGET_LOCK: &str = "nvisy_pgquery::locks";

mod client;
mod error;
pub mod executor;
pub mod expect;
mod lock;
pub mod prelude;
pub mod query;
pub mod select;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{ConnectionPool, PgClient, PgConfig, PgConn, PgPoolStatus, PooledConnection};
pub use crate::error::{AffectedRowsError, BoxError, PgError, PgResult};
pub use crate::executor::{CursorExecutor, Executor, Loader, Model, Relation, Transactional};
pub use crate::expect::{Affected, AffectedCondition, RowsAffected, expect_result, expect_success};
pub use crate::lock::{AdvisoryLock, LockId};
pub use crate::query::{
    DeleteQuery, InsertQuery, Query, QueryOption, SelectQuery, UpdateQuery, apply_options,
};
pub use crate::select::{IterStrategy, Select};
pub use crate::types::{
    AffectedOp, DeletedScope, OrderDir, PaginatedPage, Pagination, PrimaryKey, SqlValue,
    order_expr,
};
