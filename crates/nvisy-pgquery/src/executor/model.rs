//! Model metadata used to build queries.

use crate::types::PrimaryKey;

/// A relation a model can eager-load with a JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// The JOIN clause, e.g. `LEFT JOIN "owners" ON ...`.
    pub join: &'static str,
    /// Column expressions added to the selection.
    pub columns: &'static [&'static str],
}

/// A row type backed by one table.
///
/// ```ignore
/// #[derive(diesel::QueryableByName)]
/// struct Document {
///     #[diesel(sql_type = diesel::sql_types::BigInt)]
///     id: i64,
///     #[diesel(sql_type = diesel::sql_types::Text)]
///     title: String,
/// }
///
/// impl Model for Document {
///     type Key = i64;
///     const TABLE: &'static str = "documents";
///     const SOFT_DELETE_COLUMN: Option<&'static str> = Some("deleted_at");
///
///     fn primary_key(&self) -> i64 {
///         self.id
///     }
/// }
/// ```
pub trait Model: Send + Sync + 'static {
    /// The primary-key type.
    type Key: PrimaryKey;

    /// The table name.
    const TABLE: &'static str;

    /// The primary-key column.
    const PRIMARY_KEY: &'static str = "id";

    /// The nullable timestamp column marking soft-deleted rows, if any.
    const SOFT_DELETE_COLUMN: Option<&'static str> = None;

    /// Whether writes maintain the `created_at` and `updated_at` columns.
    ///
    /// Inserts fill both with `now()` unless given explicitly, and updates
    /// set `updated_at = now()`.
    const TIMESTAMPS: bool = false;

    /// Returns the primary key of this row.
    fn primary_key(&self) -> Self::Key;

    /// Resolves a relation by name.
    fn relation(name: &str) -> Option<Relation> {
        let _ = name;
        None
    }
}
