//! Comparison operators used by affected-rows assertions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The comparison an affected-row count is checked with.
///
/// Displays as the SQL-style operator, e.g. `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
pub enum AffectedOp {
    /// `actual == expected`
    #[strum(serialize = "==")]
    #[serde(rename = "==")]
    Exactly,

    /// `actual != expected`
    #[strum(serialize = "!=")]
    #[serde(rename = "!=")]
    Not,

    /// `actual < expected`
    #[strum(serialize = "<")]
    #[serde(rename = "<")]
    Lt,

    /// `actual <= expected`
    #[strum(serialize = "<=")]
    #[serde(rename = "<=")]
    Lte,

    /// `actual > expected`
    #[strum(serialize = ">")]
    #[serde(rename = ">")]
    Gt,

    /// `actual >= expected`
    #[strum(serialize = ">=")]
    #[serde(rename = ">=")]
    Gte,
}

impl AffectedOp {
    /// Returns whether `actual` satisfies this comparison against `expected`.
    #[inline]
    pub fn holds(self, expected: i64, actual: i64) -> bool {
        match self {
            AffectedOp::Exactly => actual == expected,
            AffectedOp::Not => actual != expected,
            AffectedOp::Lt => actual < expected,
            AffectedOp::Lte => actual <= expected,
            AffectedOp::Gt => actual > expected,
            AffectedOp::Gte => actual >= expected,
        }
    }
}
