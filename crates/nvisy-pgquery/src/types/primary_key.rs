//! Primary-key capability used by cursors.

use std::fmt::{Debug, Display};

use uuid::Uuid;

use super::SqlValue;
use crate::BoxError;

/// A primary-key type a cursor can move over.
///
/// Keys are either ordered scalars with a zero origin (integers and floats),
/// which support both soft and native cursors, or opaque identifiers (UUIDs,
/// strings), which only support native cursors and report `None` from
/// [`PrimaryKey::cursor_origin`].
///
/// Server-side cursors hand keys back as text, see [`PrimaryKey::parse_key`].
pub trait PrimaryKey: Clone + PartialEq + PartialOrd + Debug + Display + Send + Sync + 'static {
    /// The sentinel a soft cursor starts from, below every real key.
    fn cursor_origin() -> Option<Self>;

    /// Converts a single key into a bind value.
    fn to_value(&self) -> SqlValue;

    /// Converts a batch of keys into an array bind value.
    fn to_array(keys: &[Self]) -> SqlValue;

    /// Parses the text form of a key.
    fn parse_key(text: &str) -> Result<Self, BoxError>;
}

macro_rules! impl_ordered_key {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl PrimaryKey for $ty {
                #[inline]
                fn cursor_origin() -> Option<Self> {
                    Some($zero)
                }

                #[inline]
                fn to_value(&self) -> SqlValue {
                    SqlValue::from(*self)
                }

                #[inline]
                fn to_array(keys: &[Self]) -> SqlValue {
                    SqlValue::from(keys.to_vec())
                }

                #[inline]
                fn parse_key(text: &str) -> Result<Self, BoxError> {
                    Ok(text.parse::<$ty>()?)
                }
            }
        )*
    };
}

impl_ordered_key! {
    i16 => 0,
    i32 => 0,
    i64 => 0,
    f32 => 0.0,
    f64 => 0.0,
}

impl PrimaryKey for Uuid {
    #[inline]
    fn cursor_origin() -> Option<Self> {
        None
    }

    #[inline]
    fn to_value(&self) -> SqlValue {
        SqlValue::Uuid(*self)
    }

    #[inline]
    fn to_array(keys: &[Self]) -> SqlValue {
        SqlValue::UuidArray(keys.to_vec())
    }

    #[inline]
    fn parse_key(text: &str) -> Result<Self, BoxError> {
        Ok(Uuid::parse_str(text)?)
    }
}

impl PrimaryKey for String {
    #[inline]
    fn cursor_origin() -> Option<Self> {
        None
    }

    #[inline]
    fn to_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    #[inline]
    fn to_array(keys: &[Self]) -> SqlValue {
        SqlValue::TextArray(keys.to_vec())
    }

    #[inline]
    fn parse_key(text: &str) -> Result<Self, BoxError> {
        Ok(text.to_owned())
    }
}
