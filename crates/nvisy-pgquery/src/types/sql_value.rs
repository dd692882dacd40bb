//! Bind parameters carried by query definitions.

use std::fmt;

use uuid::Uuid;

/// A value bound to a `$n` placeholder.
///
/// Array variants are bound as PostgreSQL arrays and used with `= ANY($n)`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    SmallIntArray(Vec<i16>),
    IntArray(Vec<i32>),
    BigIntArray(Vec<i64>),
    RealArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    TextArray(Vec<String>),
    UuidArray(Vec<Uuid>),
}

impl SqlValue {
    /// Returns the number of elements of an array value, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            SqlValue::SmallIntArray(v) => Some(v.len()),
            SqlValue::IntArray(v) => Some(v.len()),
            SqlValue::BigIntArray(v) => Some(v.len()),
            SqlValue::RealArray(v) => Some(v.len()),
            SqlValue::DoubleArray(v) => Some(v.len()),
            SqlValue::TextArray(v) => Some(v.len()),
            SqlValue::UuidArray(v) => Some(v.len()),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::SmallInt(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::BigInt(v) => write!(f, "{v}"),
            SqlValue::Real(v) => write!(f, "{v}"),
            SqlValue::Double(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v:?}"),
            SqlValue::Uuid(v) => write!(f, "{v}"),
            other => write!(f, "<array of {}>", other.array_len().unwrap_or_default()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                #[inline]
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    String => Text,
    Uuid => Uuid,
    Vec<i16> => SmallIntArray,
    Vec<i32> => IntArray,
    Vec<i64> => BigIntArray,
    Vec<f32> => RealArray,
    Vec<f64> => DoubleArray,
    Vec<String> => TextArray,
    Vec<Uuid> => UuidArray,
}

impl From<&str> for SqlValue {
    #[inline]
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}
