//! ORDER BY expression construction.

use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Sorting direction.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub enum OrderDir {
    /// Ascending order.
    #[default]
    #[strum(serialize = "ASC")]
    #[serde(rename = "ASC")]
    Asc,

    /// Descending order.
    #[strum(serialize = "DESC")]
    #[serde(rename = "DESC")]
    Desc,
}

impl OrderDir {
    /// Builds `"<field> <dir>"`.
    #[inline]
    pub fn expr(self, field: &str) -> String {
        format!("{field} {self}")
    }
}

/// Builds an ORDER BY expression for `field`.
///
/// An empty direction defaults to [`OrderDir::Asc`].
///
/// # Panics
///
/// Panics when `dir` is neither empty, `ASC` nor `DESC`. Directions are
/// expected to come from code, not from user input.
pub fn order_expr(field: &str, dir: &str) -> String {
    if dir.is_empty() {
        return OrderDir::Asc.expr(field);
    }

    match OrderDir::from_str(dir) {
        Ok(dir) => dir.expr(field),
        Err(_) => panic!("invalid order direction: {dir:?}"),
    }
}
