//! Result assertions over query errors and affected-row counts.
//!
//! The "no rows" sentinel ([`diesel::result::Error::NotFound`]) is turned
//! into an [`AffectedRowsError`] evaluated against zero rows; every other
//! failure is wrapped into [`PgError::Query`].

use diesel::result::{Error, QueryResult};

use crate::types::AffectedOp;
use crate::{AffectedRowsError, BoxError, PgError, PgResult, TRACING_TARGET_QUERY};

/// A predicate over the actual number of affected rows.
///
/// Implemented by [`Affected`] and by any
/// `Fn(i64) -> Result<(), AffectedRowsError>`.
pub trait AffectedCondition {
    /// Checks the actual affected-row count.
    fn check(&self, actual: i64) -> Result<(), AffectedRowsError>;
}

impl<F> AffectedCondition for F
where
    F: Fn(i64) -> Result<(), AffectedRowsError>,
{
    #[inline]
    fn check(&self, actual: i64) -> Result<(), AffectedRowsError> {
        self(actual)
    }
}

/// A comparison of the affected-row count against an expected count.
///
/// Expected counts accept any integer type that widens to `i64` without
/// loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affected {
    op: AffectedOp,
    expected: i64,
}

impl Affected {
    /// Creates a condition from an operator and an expected count.
    #[inline]
    pub fn new(op: AffectedOp, expected: impl Into<i64>) -> Self {
        Self {
            op,
            expected: expected.into(),
        }
    }

    /// Passes when exactly `expected` rows were affected.
    #[inline]
    pub fn exactly(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Exactly, expected)
    }

    /// Passes when anything but `expected` rows were affected.
    #[inline]
    pub fn not(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Not, expected)
    }

    /// Passes when fewer than `expected` rows were affected.
    #[inline]
    pub fn lt(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Lt, expected)
    }

    /// Passes when at most `expected` rows were affected.
    #[inline]
    pub fn lte(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Lte, expected)
    }

    /// Passes when more than `expected` rows were affected.
    #[inline]
    pub fn gt(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Gt, expected)
    }

    /// Passes when at least `expected` rows were affected.
    #[inline]
    pub fn gte(expected: impl Into<i64>) -> Self {
        Self::new(AffectedOp::Gte, expected)
    }
}

impl AffectedCondition for Affected {
    fn check(&self, actual: i64) -> Result<(), AffectedRowsError> {
        if self.op.holds(self.expected, actual) {
            Ok(())
        } else {
            Err(AffectedRowsError::new(self.expected, actual, self.op))
        }
    }
}

/// Execution results that can report how many rows they affected.
pub trait RowsAffected {
    /// Returns the affected-row count, or why it is unknown.
    fn rows_affected(&self) -> Result<i64, BoxError>;
}

impl RowsAffected for i64 {
    #[inline]
    fn rows_affected(&self) -> Result<i64, BoxError> {
        Ok(*self)
    }
}

impl RowsAffected for usize {
    #[inline]
    fn rows_affected(&self) -> Result<i64, BoxError> {
        Ok(i64::try_from(*self)?)
    }
}

impl RowsAffected for u64 {
    #[inline]
    fn rows_affected(&self) -> Result<i64, BoxError> {
        Ok(i64::try_from(*self)?)
    }
}

impl<T: RowsAffected> RowsAffected for Option<T> {
    fn rows_affected(&self) -> Result<i64, BoxError> {
        match self {
            Some(inner) => inner.rows_affected(),
            None => Err("row count is not reported by the backend".into()),
        }
    }
}

/// Checks that a query succeeded.
///
/// A "no rows" result fails as `0 != 0`, so zero rows is always reported as
/// an [`AffectedRowsError`]. Any other failure is wrapped into
/// [`PgError::Query`]. On success the value is passed through.
pub fn expect_success<T>(result: QueryResult<T>) -> PgResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(Error::NotFound) => Err(AffectedRowsError::new(0, 0, AffectedOp::Not).into()),
        Err(error) => {
            tracing::debug!(target: TRACING_TARGET_QUERY, error = %error, "Query execution failed");
            Err(PgError::Query(error))
        }
    }
}

/// Checks that a query succeeded and its affected-row count satisfies every
/// condition.
///
/// With no conditions this is [`expect_success`]. A "no rows" result is
/// evaluated as zero affected rows without re-querying. Conditions run in
/// order and the first failure is returned; later conditions are not
/// evaluated.
///
/// # Errors
///
/// - [`PgError::Query`] for any execution failure other than "no rows"
/// - [`PgError::RowsAffected`] when the count cannot be obtained
/// - [`PgError::AffectedRows`] for the first failed condition
pub fn expect_result<R: RowsAffected>(
    result: QueryResult<R>,
    conditions: &[&dyn AffectedCondition],
) -> PgResult<()> {
    if conditions.is_empty() {
        return expect_success(result).map(drop);
    }

    let actual = match result {
        Ok(result) => result.rows_affected().map_err(PgError::RowsAffected)?,
        Err(Error::NotFound) => 0,
        Err(error) => return Err(PgError::Query(error)),
    };

    for condition in conditions {
        condition.check(actual)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use strum::IntoEnumIterator;

    use super::*;

    fn boom() -> Error {
        Error::QueryBuilderError("boom".into())
    }

    #[test]
    fn conditions_fail_iff_comparison_is_violated() {
        for op in AffectedOp::iter() {
            for expected in -2..=2i64 {
                for actual in -2..=2i64 {
                    let violated = match op {
                        AffectedOp::Exactly => expected != actual,
                        AffectedOp::Not => expected == actual,
                        AffectedOp::Lt => expected <= actual,
                        AffectedOp::Lte => expected < actual,
                        AffectedOp::Gt => expected >= actual,
                        AffectedOp::Gte => expected > actual,
                    };

                    let result = Affected::new(op, expected).check(actual);
                    assert_eq!(result.is_err(), violated, "{actual} {op} {expected}");

                    if let Err(err) = result {
                        assert_eq!(err.op(), op);
                        assert_eq!(err.actual(), actual);
                        assert_eq!(err.expected(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn narrower_integers_widen() {
        assert!(Affected::exactly(3u8).check(3).is_ok());
        assert!(Affected::gte(i32::MAX).check(i64::from(i32::MAX)).is_ok());
        assert!(Affected::lt(u32::MAX).check(i64::from(u32::MAX)).is_err());
    }

    #[test]
    fn success_passes_value_through() {
        assert_eq!(expect_success(Ok(7)).unwrap(), 7);
    }

    #[test]
    fn no_rows_is_an_affected_rows_error() {
        let err = expect_success::<()>(Err(Error::NotFound)).unwrap_err();
        let affected = err.affected_rows().expect("affected rows error");
        assert_eq!(affected.actual(), 0);
        assert_eq!(affected.expected(), 0);
        assert_eq!(affected.op(), AffectedOp::Not);
    }

    #[test]
    fn other_errors_are_query_errors() {
        let err = expect_success::<()>(Err(boom())).unwrap_err();
        assert!(err.is_query_execution());
    }

    #[test]
    fn no_conditions_behaves_like_expect_success() {
        let inputs: Vec<fn() -> QueryResult<usize>> =
            vec![|| Ok(0), || Ok(3), || Err(Error::NotFound), || Err(boom())];

        for input in inputs {
            let plain = expect_success(input()).map(drop);
            let with_result = expect_result(input(), &[]);
            assert_eq!(plain.is_ok(), with_result.is_ok());
            if let (Err(a), Err(b)) = (plain, with_result) {
                assert_eq!(a.to_string(), b.to_string());
                assert_eq!(a.is_affected_rows(), b.is_affected_rows());
                assert_eq!(a.is_query_execution(), b.is_query_execution());
            }
        }
    }

    #[test]
    fn no_rows_evaluates_conditions_against_zero() {
        assert!(expect_result::<usize>(Err(Error::NotFound), &[&Affected::exactly(0)]).is_ok());

        let err = expect_result::<usize>(Err(Error::NotFound), &[&Affected::gt(0)]).unwrap_err();
        assert_eq!(err.affected_rows().map(|e| e.op()), Some(AffectedOp::Gt));
    }

    #[test]
    fn other_errors_skip_conditions() {
        let called = Cell::new(false);
        let spy = |_: i64| -> Result<(), AffectedRowsError> {
            called.set(true);
            Ok(())
        };

        let err = expect_result::<usize>(Err(boom()), &[&spy]).unwrap_err();
        assert!(err.is_query_execution());
        assert!(!called.get());
    }

    #[test]
    fn stops_at_first_failing_condition() {
        let called = Cell::new(false);
        let always_fail = |actual: i64| -> Result<(), AffectedRowsError> {
            Err(AffectedRowsError::new(-1, actual, AffectedOp::Exactly))
        };
        let never_evaluated = |_: i64| -> Result<(), AffectedRowsError> {
            called.set(true);
            Ok(())
        };

        let err = expect_result(Ok(1usize), &[&always_fail, &never_evaluated]).unwrap_err();
        assert_eq!(err.affected_rows().map(|e| e.expected()), Some(-1));
        assert!(!called.get());
    }

    #[test]
    fn all_conditions_must_pass() {
        assert!(expect_result(Ok(5usize), &[&Affected::gte(1), &Affected::lte(5)]).is_ok());
        assert!(expect_result(Ok(6usize), &[&Affected::gte(1), &Affected::lte(5)]).is_err());
    }

    #[test]
    fn unknown_count_is_distinct_from_mismatch() {
        let err = expect_result(Ok(None::<usize>), &[&Affected::exactly(1)]).unwrap_err();
        assert!(matches!(err, PgError::RowsAffected(_)));
        assert!(!err.is_affected_rows());

        let err = expect_result(Ok(u64::MAX), &[&Affected::gte(0)]).unwrap_err();
        assert!(matches!(err, PgError::RowsAffected(_)));
    }
}
