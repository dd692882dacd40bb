//! Composable mutations of query definitions.
//!
//! Every option is typed by the query kinds it accepts: SELECT-only options
//! produce a `QueryOption<SelectQuery>`, while options that make sense for
//! several kinds are generic over a capability trait.

use std::fmt;
use std::sync::Arc;

use super::{Filterable, Returning, SelectQuery, SoftDeletable};
use crate::types::{DeletedScope, Pagination, RETURNING_ALL, SqlValue};

/// A mutation applied in place to a query definition of kind `Q`.
pub struct QueryOption<Q>(Arc<dyn Fn(&mut Q) + Send + Sync>);

impl<Q> QueryOption<Q> {
    /// Wraps a mutation.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Q) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// An option that leaves the query untouched.
    pub fn nop() -> Self {
        Self::new(|_| {})
    }

    /// Applies the mutation.
    #[inline]
    pub fn apply(&self, query: &mut Q) {
        (self.0)(query)
    }
}

impl<Q> Clone for QueryOption<Q> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<Q> fmt::Debug for QueryOption<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOption").finish_non_exhaustive()
    }
}

/// Folds options left to right over `query` and returns it.
pub fn apply_options<Q>(mut query: Q, options: &[QueryOption<Q>]) -> Q {
    for option in options {
        option.apply(&mut query);
    }

    query
}

/// Eager-loads the named relations.
///
/// # Panics
///
/// Applying the option panics when the model does not declare one of the
/// relations.
pub fn relations<I, S>(names: I) -> QueryOption<SelectQuery>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    QueryOption::new(move |query: &mut SelectQuery| {
        for name in &names {
            query.add_relation(name);
        }
    })
}

/// Locks the selected rows with the given strength, e.g. `SHARE`.
pub fn select_for(strength: impl Into<String>) -> QueryOption<SelectQuery> {
    let strength = strength.into();
    QueryOption::new(move |query: &mut SelectQuery| {
        query.set_lock(strength.clone());
    })
}

/// Locks the selected rows with `FOR UPDATE`.
pub fn select_for_update() -> QueryOption<SelectQuery> {
    select_for("UPDATE")
}

/// Restricts the query to soft-deleted rows.
pub fn where_deleted<Q: SoftDeletable>() -> QueryOption<Q> {
    where_deleted_flag(DeletedScope::OnlyDeleted)
}

/// Includes soft-deleted rows.
pub fn where_all_with_deleted<Q: SoftDeletable>() -> QueryOption<Q> {
    where_deleted_flag(DeletedScope::WithDeleted)
}

/// Sets the soft-delete visibility explicitly.
pub fn where_deleted_flag<Q: SoftDeletable>(scope: DeletedScope) -> QueryOption<Q> {
    QueryOption::new(move |query: &mut Q| {
        query.set_deleted_scope(scope);
    })
}

/// Skips the first `offset` rows.
pub fn offset(offset: impl Into<i64>) -> QueryOption<SelectQuery> {
    let offset = offset.into();
    QueryOption::new(move |query: &mut SelectQuery| {
        query.set_offset(offset);
    })
}

/// Returns at most `limit` rows.
pub fn limit(limit: impl Into<i64>) -> QueryOption<SelectQuery> {
    let limit = limit.into();
    QueryOption::new(move |query: &mut SelectQuery| {
        query.set_limit(limit);
    })
}

/// Applies the offset and limit of a validated page request.
pub fn paginate(pagination: Pagination) -> QueryOption<SelectQuery> {
    QueryOption::new(move |query: &mut SelectQuery| {
        query
            .set_offset(pagination.offset())
            .set_limit(pagination.limit());
    })
}

/// Appends an ORDER BY expression, e.g. from [`order_expr`].
///
/// [`order_expr`]: crate::order_expr
pub fn order_by(expr: impl Into<String>) -> QueryOption<SelectQuery> {
    let expr = expr.into();
    QueryOption::new(move |query: &mut SelectQuery| {
        query.order_by(expr.clone());
    })
}

/// Adds a raw WHERE fragment with `?` placeholders; `\?` is a literal question mark.
pub fn where_expr<Q: Filterable>(sql: impl Into<String>, binds: Vec<SqlValue>) -> QueryOption<Q> {
    let condition = super::Condition::raw(sql, binds);
    QueryOption::new(move |query: &mut Q| {
        query.filter(condition.clone());
    })
}

/// Sets the RETURNING clause.
pub fn returning<Q: Returning>(returning: impl Into<String>) -> QueryOption<Q> {
    let returning = returning.into();
    QueryOption::new(move |query: &mut Q| {
        query.set_returning(returning.clone());
    })
}

/// Sets `RETURNING *`.
pub fn returning_all<Q: Returning>() -> QueryOption<Q> {
    returning(RETURNING_ALL)
}
