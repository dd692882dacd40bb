//! Soft-delete visibility for queries over soft-deletable models.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which rows a query sees with respect to the soft-delete column.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeletedScope {
    /// Only rows that are not soft-deleted.
    #[default]
    Default,

    /// All rows, including soft-deleted ones.
    WithDeleted,

    /// Only soft-deleted rows.
    OnlyDeleted,
}

impl DeletedScope {
    /// Returns the predicate for the given soft-delete column, if any.
    pub fn predicate(self, column: &str) -> Option<String> {
        match self {
            DeletedScope::Default => Some(format!("{column} IS NULL")),
            DeletedScope::WithDeleted => None,
            DeletedScope::OnlyDeleted => Some(format!("{column} IS NOT NULL")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        let column = r#""widgets"."deleted_at""#;
        assert_eq!(
            DeletedScope::Default.predicate(column).as_deref(),
            Some(r#""widgets"."deleted_at" IS NULL"#)
        );
        assert_eq!(DeletedScope::WithDeleted.predicate(column), None);
        assert_eq!(
            DeletedScope::OnlyDeleted.predicate(column).as_deref(),
            Some(r#""widgets"."deleted_at" IS NOT NULL"#)
        );
    }
}
