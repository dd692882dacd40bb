//! String constants for hand-written SQL fragments.

/// Separator for AND-joined condition groups.
pub const SEP_AND: &str = " AND ";

/// Separator for OR-joined condition groups.
pub const SEP_OR: &str = " OR ";

/// Separator for negated condition groups.
pub const SEP_NOT: &str = " NOT ";

/// `RETURNING *` argument, see [`returning_all`].
///
/// [`returning_all`]: crate::query::returning_all
pub const RETURNING_ALL: &str = "*";

/// Creation timestamp column of timestamped models.
pub const CREATED_AT: &str = "created_at";

/// Last-modification timestamp column of timestamped models.
pub const UPDATED_AT: &str = "updated_at";
