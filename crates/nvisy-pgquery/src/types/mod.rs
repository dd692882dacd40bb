//! Value types shared by the query, assertion and iteration layers.

mod affected_op;
mod constants;
mod deleted_scope;
mod order;
mod pagination;
mod primary_key;
mod sql_value;

pub use affected_op::AffectedOp;
pub use constants::{CREATED_AT, RETURNING_ALL, SEP_AND, SEP_NOT, SEP_OR, UPDATED_AT};
pub use deleted_scope::DeletedScope;
pub use order::{OrderDir, order_expr};
pub use pagination::{PaginatedPage, Pagination};
pub use primary_key::PrimaryKey;
pub use sql_value::SqlValue;
