//! DELETE query definitions.

use super::{Condition, Filterable, Returning, SoftDeletable, Statement, push_where, quote_ident};
use crate::executor::Model;
use crate::types::DeletedScope;

/// A DELETE from one table.
///
/// Soft-deletable models still get a hard DELETE here; the soft-delete
/// scope only narrows which rows it matches.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    conditions: Vec<Condition>,
    soft_delete_column: Option<String>,
    deleted_scope: DeletedScope,
    returning: Option<String>,
}

impl DeleteQuery {
    /// Creates a DELETE from `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            soft_delete_column: None,
            deleted_scope: DeletedScope::Default,
            returning: None,
        }
    }

    /// Creates a DELETE from the table of `M`.
    pub fn for_model<M: Model>() -> Self {
        let mut query = Self::new(M::TABLE);
        query.soft_delete_column = M::SOFT_DELETE_COLUMN
            .map(|column| format!("{}.{}", quote_ident(M::TABLE), quote_ident(column)));
        query
    }

    /// Returns the RETURNING clause, if set.
    #[inline]
    pub fn returning(&self) -> Option<&str> {
        self.returning.as_deref()
    }

    /// Renders the query.
    pub fn to_statement(&self) -> Statement {
        let mut statement = Statement::new(format!("DELETE FROM {}", quote_ident(&self.table)));
        push_where(
            &mut statement,
            &self.conditions,
            self.soft_delete_column.as_deref(),
            self.deleted_scope,
        );

        if let Some(returning) = &self.returning {
            statement.push_sql(" RETURNING ");
            statement.push_sql(returning);
        }

        statement
    }
}

impl Filterable for DeleteQuery {
    fn filter(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }
}

impl SoftDeletable for DeleteQuery {
    fn set_deleted_scope(&mut self, scope: DeletedScope) -> &mut Self {
        self.deleted_scope = scope;
        self
    }
}

impl Returning for DeleteQuery {
    fn set_returning(&mut self, returning: String) -> &mut Self {
        self.returning = Some(returning);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Widget;

    #[test]
    fn only_deleted_rows() {
        let mut query = DeleteQuery::for_model::<Widget>();
        query
            .set_deleted_scope(DeletedScope::OnlyDeleted)
            .set_returning("id".to_owned());

        assert_eq!(
            query.to_statement().sql(),
            r#"DELETE FROM "widgets" WHERE "widgets"."deleted_at" IS NOT NULL RETURNING id"#
        );
    }
}
