//! Rendered SQL text with positional binds.

use crate::types::SqlValue;

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// SQL text with `$n` placeholders and the values bound to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    sql: String,
    binds: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement from SQL text without binds.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    /// Creates a statement from a fragment using `?` placeholders.
    ///
    /// # Panics
    ///
    /// Panics when the number of `?` placeholders differs from the number of binds.
    pub fn with_binds(sql: &str, binds: Vec<SqlValue>) -> Self {
        let mut statement = Self::default();
        statement.push_fragment(sql, binds);
        statement
    }

    /// Returns the SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bind values in placeholder order.
    #[inline]
    pub fn binds(&self) -> &[SqlValue] {
        &self.binds
    }

    /// Splits the statement into its text and binds.
    #[inline]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.binds)
    }

    /// Appends SQL text verbatim.
    pub(crate) fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Prepends SQL text verbatim; placeholders are unaffected.
    pub(crate) fn prepend_sql(&mut self, sql: &str) {
        self.sql.insert_str(0, sql);
    }

    /// Appends a single bind and its placeholder.
    pub(crate) fn push_bind(&mut self, value: SqlValue) {
        self.binds.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.binds.len().to_string());
    }

    /// Appends a fragment, numbering its `?` placeholders after the existing binds.
    ///
    /// `\?` renders a literal `?`, e.g. for the jsonb `?`, `?|` and `?&` operators.
    ///
    /// # Panics
    ///
    /// Panics when the number of `?` placeholders differs from the number of binds.
    pub(crate) fn push_fragment(&mut self, sql: &str, binds: Vec<SqlValue>) {
        let placeholders = count_placeholders(sql);
        assert_eq!(
            placeholders,
            binds.len(),
            "fragment {sql:?} has {placeholders} placeholders but {} binds",
            binds.len()
        );

        let mut binds = binds.into_iter();
        for token in tokens(sql) {
            match token {
                Token::Text(text) => self.sql.push_str(text),
                Token::Question => self.sql.push('?'),
                Token::Placeholder => {
                    // Counted above, the iterator cannot run dry here.
                    if let Some(value) = binds.next() {
                        self.push_bind(value);
                    }
                }
            }
        }
    }
}

/// A piece of a raw fragment.
enum Token<'a> {
    Text(&'a str),
    /// An escaped `\?`.
    Question,
    Placeholder,
}

fn tokens(sql: &str) -> impl Iterator<Item = Token<'_>> {
    let mut rest = sql;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        if let Some(tail) = rest.strip_prefix("\\?") {
            rest = tail;
            return Some(Token::Question);
        }

        if let Some(tail) = rest.strip_prefix('?') {
            rest = tail;
            return Some(Token::Placeholder);
        }

        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(i, c)| c == '?' || (c == '\\' && rest[i..].starts_with("\\?")))
            .map_or(rest.len(), |(i, _)| i);
        let (text, tail) = rest.split_at(end);
        rest = tail;
        Some(Token::Text(text))
    })
}

/// Counts unescaped `?` placeholders in a fragment.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    tokens(sql)
        .filter(|token| matches!(token, Token::Placeholder))
        .count()
}
