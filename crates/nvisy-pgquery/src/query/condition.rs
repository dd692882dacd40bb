//! WHERE conditions.

use super::Statement;
use super::statement::count_placeholders;
use crate::types::SqlValue;

/// A single WHERE condition.
///
/// The structured variants are the ones cursors produce; anything else is a
/// raw fragment with `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A raw SQL fragment, rendered in parentheses.
    Raw { sql: String, binds: Vec<SqlValue> },
    /// `column > value`
    Gt { column: String, value: SqlValue },
    /// `column = ANY(values)`, where `values` is an array bind.
    AnyOf { column: String, values: SqlValue },
}

impl Condition {
    /// Creates a raw condition. Write `\?` for a literal question mark.
    ///
    /// # Panics
    ///
    /// Panics when the number of `?` placeholders differs from the number of binds.
    pub fn raw(sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        let sql = sql.into();
        let placeholders = count_placeholders(&sql);
        assert_eq!(
            placeholders,
            binds.len(),
            "condition {sql:?} has {placeholders} placeholders but {} binds",
            binds.len()
        );

        Self::Raw { sql, binds }
    }

    /// Creates `column > value`.
    pub fn gt(column: impl Into<String>, value: SqlValue) -> Self {
        Self::Gt {
            column: column.into(),
            value,
        }
    }

    /// Creates `column = ANY(values)`.
    ///
    /// # Panics
    ///
    /// Panics when `values` is not an array value.
    pub fn any_of(column: impl Into<String>, values: SqlValue) -> Self {
        assert!(
            values.array_len().is_some(),
            "ANY() requires an array value, got {values}"
        );

        Self::AnyOf {
            column: column.into(),
            values,
        }
    }

    pub(crate) fn render(&self, statement: &mut Statement) {
        match self {
            Condition::Raw { sql, binds } => {
                statement.push_sql("(");
                statement.push_fragment(sql, binds.clone());
                statement.push_sql(")");
            }
            Condition::Gt { column, value } => {
                statement.push_sql(column);
                statement.push_sql(" > ");
                statement.push_bind(value.clone());
            }
            Condition::AnyOf { column, values } => {
                statement.push_sql(column);
                statement.push_sql(" = ANY(");
                statement.push_bind(values.clone());
                statement.push_sql(")");
            }
        }
    }
}
