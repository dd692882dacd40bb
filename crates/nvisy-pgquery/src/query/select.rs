//! SELECT query definitions.

use super::{Condition, Filterable, SoftDeletable, Statement, push_where, quote_ident};
use crate::executor::{Model, Relation};
use crate::types::{DeletedScope, SqlValue};

/// Resolves relation names for the model a query was built for.
type RelationResolver = fn(&str) -> Option<Relation>;

fn no_relations(_: &str) -> Option<Relation> {
    None
}

/// A SELECT over one table.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: Option<String>,
    soft_delete_column: Option<String>,
    deleted_scope: DeletedScope,
    relations: Vec<String>,
    relation_columns: Vec<String>,
    resolve_relation: RelationResolver,
}

impl SelectQuery {
    /// Creates a `SELECT "table".* FROM "table"` query.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            soft_delete_column: None,
            deleted_scope: DeletedScope::Default,
            relations: Vec::new(),
            relation_columns: Vec::new(),
            resolve_relation: no_relations,
        }
    }

    /// Creates a query over the table of `M`, honouring its soft-delete
    /// column and relations.
    pub fn for_model<M: Model>() -> Self {
        let mut query = Self::new(M::TABLE);
        query.soft_delete_column = M::SOFT_DELETE_COLUMN.map(|column| query.qualify(column));
        query.resolve_relation = M::relation;
        query
    }

    /// Returns `"table"."column"`.
    pub fn qualify(&self, column: &str) -> String {
        format!("{}.{}", quote_ident(&self.table), quote_ident(column))
    }

    /// Returns the table name.
    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the explicitly selected column expressions.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the WHERE conditions.
    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns the ORDER BY expressions.
    #[inline]
    pub fn order_exprs(&self) -> &[String] {
        &self.order_by
    }

    /// Returns the LIMIT, if set.
    #[inline]
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Returns the OFFSET, if set.
    #[inline]
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Returns the row-locking clause, if set.
    #[inline]
    pub fn lock(&self) -> Option<&str> {
        self.lock.as_deref()
    }

    /// Returns the soft-delete visibility.
    #[inline]
    pub fn deleted_scope(&self) -> DeletedScope {
        self.deleted_scope
    }

    /// Returns the eager-loaded relation names.
    #[inline]
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// Replaces the selected columns with a single expression.
    pub fn set_column_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.columns = vec![expr.into()];
        self
    }

    /// Adds a selected column expression.
    pub fn column_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.columns.push(expr.into());
        self
    }

    /// Adds a JOIN clause verbatim.
    pub fn join(&mut self, join: impl Into<String>) -> &mut Self {
        self.joins.push(join.into());
        self
    }

    /// Adds a raw WHERE fragment with `?` placeholders.
    pub fn where_expr(&mut self, sql: impl Into<String>, binds: Vec<SqlValue>) -> &mut Self {
        self.filter(Condition::raw(sql, binds))
    }

    /// Adds a GROUP BY expression.
    pub fn group_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    /// Adds an ORDER BY expression, e.g. from [`order_expr`].
    ///
    /// [`order_expr`]: crate::order_expr
    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.order_by.push(expr.into());
        self
    }

    /// Sets the LIMIT.
    pub fn set_limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the OFFSET.
    pub fn set_offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the row-locking strength, e.g. `UPDATE` or `SHARE`.
    ///
    /// Renders as `FOR <strength> OF "table"`.
    pub fn set_lock(&mut self, strength: impl Into<String>) -> &mut Self {
        self.lock = Some(strength.into());
        self
    }

    /// Eager-loads a relation of the model this query was built for.
    ///
    /// # Panics
    ///
    /// Panics when the model does not declare the relation.
    pub fn add_relation(&mut self, name: &str) -> &mut Self {
        let Some(relation) = (self.resolve_relation)(name) else {
            panic!("unknown relation {name:?} on table {:?}", self.table);
        };

        if !self.relations.iter().any(|loaded| loaded == name) {
            self.relations.push(name.to_owned());
            self.joins.push(relation.join.to_owned());
            self.relation_columns
                .extend(relation.columns.iter().map(|column| (*column).to_owned()));
        }

        self
    }

    /// Renders the query.
    pub fn to_statement(&self) -> Statement {
        let mut columns = if self.columns.is_empty() {
            vec![format!("{}.*", quote_ident(&self.table))]
        } else {
            self.columns.clone()
        };
        columns.extend(self.relation_columns.iter().cloned());

        let mut statement = Statement::new("SELECT ");
        statement.push_sql(&columns.join(", "));

        self.push_body(&mut statement);

        if !self.order_by.is_empty() {
            statement.push_sql(" ORDER BY ");
            statement.push_sql(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            statement.push_sql(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            statement.push_sql(&format!(" OFFSET {offset}"));
        }

        if let Some(lock) = &self.lock {
            statement.push_sql(&format!(" FOR {lock} OF {}", quote_ident(&self.table)));
        }

        statement
    }

    /// Renders `SELECT count(*)` over this query without ordering,
    /// pagination or locking.
    pub fn to_count_statement(&self) -> Statement {
        let mut statement = Statement::new("SELECT count(*) AS \"count\" FROM (SELECT 1");
        self.push_body(&mut statement);
        statement.push_sql(") AS \"counted\"");
        statement
    }

    /// Renders `FROM`, joins, `WHERE` and `GROUP BY`.
    fn push_body(&self, statement: &mut Statement) {
        statement.push_sql(" FROM ");
        statement.push_sql(&quote_ident(&self.table));

        for join in &self.joins {
            statement.push_sql(" ");
            statement.push_sql(join);
        }

        push_where(
            statement,
            &self.conditions,
            self.soft_delete_column.as_deref(),
            self.deleted_scope,
        );

        if !self.group_by.is_empty() {
            statement.push_sql(" GROUP BY ");
            statement.push_sql(&self.group_by.join(", "));
        }
    }
}

impl Filterable for SelectQuery {
    fn filter(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }
}

impl SoftDeletable for SelectQuery {
    fn set_deleted_scope(&mut self, scope: DeletedScope) -> &mut Self {
        self.deleted_scope = scope;
        self
    }
}
