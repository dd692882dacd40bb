//! Prelude module for nvisy-pgquery.
//!
//! Re-exports the types and traits most callers need with a single `use`.
//!
//! ```rust,no_run
//! use nvisy_pgquery::prelude::*;
//!
//! # async fn example() -> PgResult<()> {
//! let client = PgConfig::new("postgresql://localhost/mydb").build()?;
//! let mut conn = client.get_connection().await?;
//! # Ok(())
//! # }
//! ```

// Client types
pub use crate::client::{PgClient, PgConfig, PgConn, PgPoolStatus};
// Execution contracts
pub use crate::executor::{CursorExecutor, Executor, Loader, Model, Relation, Transactional};
// Result assertions
pub use crate::expect::{Affected, expect_result, expect_success};
// Query definitions and options
pub use crate::query::{
    DeleteQuery, Filterable, InsertQuery, Query, QueryOption, Returning, SelectQuery,
    SoftDeletable, UpdateQuery, apply_options, update_columns,
};
// Iteration and locking
pub use crate::select::{IterStrategy, Select};
pub use crate::lock::{AdvisoryLock, LockId};
// Types
pub use crate::types::{DeletedScope, OrderDir, PaginatedPage, Pagination, PrimaryKey, order_expr};
// Error types
pub use crate::{PgError, PgResult};
