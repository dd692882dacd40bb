//! UPDATE query definitions.

use super::{Condition, Filterable, Returning, SoftDeletable, Statement, push_where, quote_ident};
use crate::executor::Model;
use crate::types::{DeletedScope, PrimaryKey, SqlValue, UPDATED_AT};

/// An UPDATE of one table.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    assignments: Vec<(String, SqlValue)>,
    raw_assignments: Vec<String>,
    conditions: Vec<Condition>,
    soft_delete_column: Option<String>,
    deleted_scope: DeletedScope,
    returning: Option<String>,
    timestamps: bool,
}

impl UpdateQuery {
    /// Creates an UPDATE of `table` without assignments.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            raw_assignments: Vec::new(),
            conditions: Vec::new(),
            soft_delete_column: None,
            deleted_scope: DeletedScope::Default,
            returning: None,
            timestamps: false,
        }
    }

    /// Creates an UPDATE of the row of `M` with the given primary key.
    pub fn for_key<M: Model>(key: &M::Key) -> Self {
        let mut query = Self::new(M::TABLE);
        query.soft_delete_column = M::SOFT_DELETE_COLUMN.map(|column| query.qualify(column));
        query.timestamps = M::TIMESTAMPS;
        let key_column = query.qualify(M::PRIMARY_KEY);
        query.filter(Condition::raw(format!("{key_column} = ?"), vec![key.to_value()]));
        query
    }

    /// Returns `"table"."column"`.
    pub fn qualify(&self, column: &str) -> String {
        format!("{}.{}", quote_ident(&self.table), quote_ident(column))
    }

    /// Assigns a bound value to a column.
    pub fn set(&mut self, column: impl Into<String>, value: SqlValue) -> &mut Self {
        self.assignments.push((column.into(), value));
        self
    }

    /// Adds a raw assignment such as `"hits" = "hits" + 1`.
    pub fn set_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.raw_assignments.push(expr.into());
        self
    }

    /// Returns the RETURNING clause, if set.
    #[inline]
    pub fn returning(&self) -> Option<&str> {
        self.returning.as_deref()
    }

    /// Renders the query.
    ///
    /// # Panics
    ///
    /// Panics when the query has no assignments.
    pub fn to_statement(&self) -> Statement {
        let stamp = self.timestamps
            && !self.assignments.iter().any(|(column, _)| column == UPDATED_AT);
        assert!(
            stamp || !self.assignments.is_empty() || !self.raw_assignments.is_empty(),
            "update of {:?} has no assignments",
            self.table
        );

        let mut statement = Statement::new(format!("UPDATE {} SET ", quote_ident(&self.table)));
        let mut first = true;
        for (column, value) in &self.assignments {
            if !first {
                statement.push_sql(", ");
            }
            first = false;
            statement.push_sql(&quote_ident(column));
            statement.push_sql(" = ");
            statement.push_bind(value.clone());
        }

        for expr in &self.raw_assignments {
            if !first {
                statement.push_sql(", ");
            }
            first = false;
            statement.push_sql(expr);
        }

        if stamp {
            if !first {
                statement.push_sql(", ");
            }
            statement.push_sql(&format!("{} = now()", quote_ident(UPDATED_AT)));
        }

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

impl Filterable for UpdateQuery {
    fn filter(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }
}

impl SoftDeletable for UpdateQuery {
    fn set_deleted_scope(&mut self, scope: DeletedScope) -> &mut Self {
        self.deleted_scope = scope;
        self
    }
}

impl Returning for UpdateQuery {
    fn set_returning(&mut self, returning: String) -> &mut Self {
        self.returning = Some(returning);
        self
    }
}

/// Builds an UPDATE of the given columns of one row of `M`.
///
/// With no columns the row is only touched: timestamped models get
/// `updated_at = now()`, others `key = key`, which still fires row-level
/// triggers.
pub fn update_columns<M: Model>(key: &M::Key, columns: Vec<(&str, SqlValue)>) -> UpdateQuery {
    let mut query = UpdateQuery::for_key::<M>(key);

    if columns.is_empty() && !M::TIMESTAMPS {
        let key_column = quote_ident(M::PRIMARY_KEY);
        query.set_expr(format!("{key_column} = {key_column}"));
    }

    for (column, value) in columns {
        query.set(column, value);
    }

    query
}
