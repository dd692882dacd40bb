//! Query definitions and the options that mutate them.
//!
//! A query definition is one of [`SelectQuery`], [`InsertQuery`],
//! [`UpdateQuery`] or [`DeleteQuery`]; [`Query`] is the sum of the four and
//! is what executors receive. Options are typed by the query kind they
//! accept, so applying a SELECT-only option to a DELETE does not compile.
//!
//! Definitions render to PostgreSQL text with `$n` placeholders. Raw
//! fragments use `?` for their bind positions.

mod condition;
mod delete;
mod insert;
mod options;
mod select;
mod statement;
mod update;

use strum::{Display, EnumIs};

pub use self::condition::Condition;
pub use self::delete::DeleteQuery;
pub use self::insert::InsertQuery;
pub use self::options::{
    QueryOption, apply_options, limit, offset, order_by, paginate, relations, returning,
    returning_all, select_for, select_for_update, where_all_with_deleted, where_deleted,
    where_deleted_flag, where_expr,
};
pub use self::select::SelectQuery;
pub use self::statement::{Statement, quote_ident};
pub use self::update::{UpdateQuery, update_columns};
use crate::types::{DeletedScope, SEP_AND};

/// Queries that accept WHERE conditions.
pub trait Filterable {
    /// Appends a condition; conditions are AND-ed together.
    fn filter(&mut self, condition: Condition) -> &mut Self;
}

/// Queries whose visibility of soft-deleted rows can be switched.
pub trait SoftDeletable {
    /// Sets which rows are visible with respect to the soft-delete column.
    fn set_deleted_scope(&mut self, scope: DeletedScope) -> &mut Self;
}

/// Queries that accept a RETURNING clause.
pub trait Returning {
    /// Sets the RETURNING clause.
    fn set_returning(&mut self, returning: String) -> &mut Self;
}

/// The kind of a query definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// Any query definition.
#[derive(Debug, Clone, EnumIs)]
pub enum Query {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl Query {
    /// Returns the kind of this query.
    pub fn kind(&self) -> QueryKind {
        match self {
            Query::Select(_) => QueryKind::Select,
            Query::Insert(_) => QueryKind::Insert,
            Query::Update(_) => QueryKind::Update,
            Query::Delete(_) => QueryKind::Delete,
        }
    }

    /// Renders the query to SQL text and its binds.
    pub fn to_statement(&self) -> Statement {
        match self {
            Query::Select(query) => query.to_statement(),
            Query::Insert(query) => query.to_statement(),
            Query::Update(query) => query.to_statement(),
            Query::Delete(query) => query.to_statement(),
        }
    }
}

impl From<SelectQuery> for Query {
    #[inline]
    fn from(value: SelectQuery) -> Self {
        Query::Select(value)
    }
}

impl From<InsertQuery> for Query {
    #[inline]
    fn from(value: InsertQuery) -> Self {
        Query::Insert(value)
    }
}

impl From<UpdateQuery> for Query {
    #[inline]
    fn from(value: UpdateQuery) -> Self {
        Query::Update(value)
    }
}

impl From<DeleteQuery> for Query {
    #[inline]
    fn from(value: DeleteQuery) -> Self {
        Query::Delete(value)
    }
}

/// Appends `WHERE ...` for the given conditions and soft-delete predicate.
fn push_where(
    statement: &mut Statement,
    conditions: &[Condition],
    soft_delete_column: Option<&str>,
    scope: DeletedScope,
) {
    let deleted = soft_delete_column.and_then(|column| scope.predicate(column));
    if conditions.is_empty() && deleted.is_none() {
        return;
    }

    statement.push_sql(" WHERE ");
    let mut first = true;
    for condition in conditions {
        if !first {
            statement.push_sql(SEP_AND);
        }
        first = false;
        condition.render(statement);
    }

    if let Some(deleted) = deleted {
        if !first {
            statement.push_sql(SEP_AND);
        }
        statement.push_sql(&deleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlValue;

    #[test]
    fn kinds() {
        let query = Query::from(SelectQuery::new("widgets"));
        assert_eq!(query.kind(), QueryKind::Select);
        assert!(query.is_select());
        assert_eq!(QueryKind::Delete.to_string(), "DELETE");
    }

    #[test]
    fn renders_through_the_sum_type() {
        let mut delete = DeleteQuery::new("widgets");
        delete.filter(Condition::raw("name = ?", vec!["old".into()]));

        let statement = Query::from(delete).to_statement();
        assert_eq!(statement.sql(), r#"DELETE FROM "widgets" WHERE (name = $1)"#);
        assert_eq!(statement.binds(), &[SqlValue::Text("old".into())]);
    }
}
