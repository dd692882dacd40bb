//! INSERT query definitions.

use super::{Returning, Statement, quote_ident};
use crate::executor::Model;
use crate::types::{CREATED_AT, SqlValue, UPDATED_AT};

/// An INSERT of one or more rows into one table.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    returning: Option<String>,
    timestamps: bool,
}

impl InsertQuery {
    /// Creates an INSERT into `table` with the given column names.
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            returning: None,
            timestamps: false,
        }
    }

    /// Creates an INSERT into the table of `M`, filling its timestamps.
    pub fn for_model<M, I, S>(columns: I) -> Self
    where
        M: Model,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::new(M::TABLE, columns);
        query.timestamps = M::TIMESTAMPS;
        query
    }

    /// Adds a row of values.
    ///
    /// # Panics
    ///
    /// Panics when the row length differs from the number of columns.
    pub fn values(&mut self, row: Vec<SqlValue>) -> &mut Self {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "insert into {:?} expects {} values per row",
            self.table,
            self.columns.len()
        );

        self.rows.push(row);
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
    /// Panics when no rows were added.
    pub fn to_statement(&self) -> Statement {
        assert!(!self.rows.is_empty(), "insert into {:?} has no rows", self.table);

        let stamped: Vec<&str> = if self.timestamps {
            [CREATED_AT, UPDATED_AT]
                .into_iter()
                .filter(|stamp| !self.columns.iter().any(|column| column == stamp))
                .collect()
        } else {
            Vec::new()
        };

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(String::as_str)
            .chain(stamped.iter().copied())
            .map(quote_ident)
            .collect();
        let mut statement = Statement::new(format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_ident(&self.table),
            columns.join(", ")
        ));

        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                statement.push_sql(", ");
            }
            statement.push_sql("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    statement.push_sql(", ");
                }
                statement.push_bind(value.clone());
            }
            for (j, _) in stamped.iter().enumerate() {
                if j > 0 || !row.is_empty() {
                    statement.push_sql(", ");
                }
                statement.push_sql("now()");
            }
            statement.push_sql(")");
        }

        if let Some(returning) = &self.returning {
            statement.push_sql(" RETURNING ");
            statement.push_sql(returning);
        }

        statement
    }
}

impl Returning for InsertQuery {
    fn set_returning(&mut self, returning: String) -> &mut Self {
        self.returning = Some(returning);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Document, Widget};

    #[test]
    fn renders_multi_row_insert() {
        let mut query = InsertQuery::new("widgets", ["name", "weight"]);
        query
            .values(vec!["a".into(), 1i32.into()])
            .values(vec!["b".into(), 2i32.into()])
            .set_returning("id".to_owned());

        let statement = query.to_statement();
        assert_eq!(
            statement.sql(),
            r#"INSERT INTO "widgets" ("name", "weight") VALUES ($1, $2), ($3, $4) RETURNING id"#
        );
        assert_eq!(statement.binds().len(), 4);
    }

    #[test]
    #[should_panic(expected = "values per row")]
    fn short_rows_panic() {
        InsertQuery::new("widgets", ["name", "weight"]).values(vec!["a".into()]);
    }

    #[test]
    #[should_panic(expected = "has no rows")]
    fn insert_without_rows_panics() {
        let _ = InsertQuery::new("widgets", ["name"]).to_statement();
    }

    #[test]
    fn timestamped_models_fill_both_stamps() {
        let mut query = InsertQuery::for_model::<Document, _, _>(["title"]);
        query.values(vec!["a".into()]).values(vec!["b".into()]);

        assert_eq!(
            query.to_statement().sql(),
            concat!(
                r#"INSERT INTO "documents" ("title", "created_at", "updated_at")"#,
                r#" VALUES ($1, now(), now()), ($2, now(), now())"#
            )
        );
    }

    #[test]
    fn explicit_created_at_is_kept() {
        let mut query = InsertQuery::for_model::<Document, _, _>(["title", "created_at"]);
        query.values(vec!["a".into(), "2024-01-01".into()]);

        let statement = query.to_statement();
        assert_eq!(
            statement.sql(),
            r#"INSERT INTO "documents" ("title", "created_at", "updated_at") VALUES ($1, $2, now())"#
        );
        assert_eq!(statement.binds().len(), 2);
    }

    #[test]
    fn plain_models_are_not_stamped() {
        let mut query = InsertQuery::for_model::<Widget, _, _>(["name"]);
        query.values(vec!["a".into()]);

        assert_eq!(
            query.to_statement().sql(),
            r#"INSERT INTO "widgets" ("name") VALUES ($1)"#
        );
    }
}
