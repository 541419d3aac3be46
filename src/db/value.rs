//! Database values and their conversion to Rust types.
//!
//! `DatabaseValue` is the closed set of storage classes a result column can
//! hold. Decoding into Rust types goes through `FromDatabaseValue`, which
//! reports "not convertible" as `None` and leaves NULL handling to the row
//! accessors.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::escape::escape_string;

/// A scalar value read from, or bound to, an SQL statement.
///
/// Equality is structural: `Null == Null` holds, unlike SQL comparison, and
/// reals compare by bit pattern so a NaN equals itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum DatabaseValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl PartialEq for DatabaseValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DatabaseValue::Null, DatabaseValue::Null) => true,
            (DatabaseValue::Integer(a), DatabaseValue::Integer(b)) => a == b,
            (DatabaseValue::Real(a), DatabaseValue::Real(b)) => a.to_bits() == b.to_bits(),
            (DatabaseValue::Text(a), DatabaseValue::Text(b)) => a == b,
            (DatabaseValue::Blob(a), DatabaseValue::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Extract as `&str` if the value is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Extract as i64 if the value is numeric.
    ///
    /// Reals are accepted only when they hold an integral value that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Integer(i) => Some(*i),
            DatabaseValue::Real(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Extract as f64 if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatabaseValue::Integer(i) => Some(*i as f64),
            DatabaseValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric values are true when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Integer(i) => Some(*i != 0),
            DatabaseValue::Real(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Storage class name, used in conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Integer(_) => "integer",
            DatabaseValue::Real(_) => "real",
            DatabaseValue::Text(_) => "text",
            DatabaseValue::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => write!(f, "NULL"),
            DatabaseValue::Integer(i) => write!(f, "{}", i),
            DatabaseValue::Real(r) => write!(f, "{:?}", r),
            DatabaseValue::Text(s) => write!(f, "\"{}\"", escape_string(s)),
            DatabaseValue::Blob(bytes) => write!(f, "x'{}'", hex::encode(bytes)),
        }
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Integer(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Integer(i64::from(value))
    }
}

impl From<u32> for DatabaseValue {
    fn from(value: u32) -> Self {
        DatabaseValue::Integer(i64::from(value))
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Integer(if value { 1 } else { 0 })
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Real(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::Text(value.to_string())
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::Text(value)
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Blob(value)
    }
}

impl From<&[u8]> for DatabaseValue {
    fn from(value: &[u8]) -> Self {
        DatabaseValue::Blob(value.to_vec())
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DatabaseValue::Null)
    }
}

/// Types that can be decoded from a non-NULL database value.
///
/// Implementations return `None` when the stored value cannot represent
/// `Self`; the caller turns that into a conversion failure.
pub trait FromDatabaseValue: Sized {
    /// Name used in conversion error messages.
    const TYPE_NAME: &'static str;

    fn from_database_value(value: &DatabaseValue) -> Option<Self>;
}

impl FromDatabaseValue for DatabaseValue {
    const TYPE_NAME: &'static str = "DatabaseValue";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromDatabaseValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromDatabaseValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromDatabaseValue for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_i64().and_then(|i| u32::try_from(i).ok())
    }
}

impl FromDatabaseValue for usize {
    const TYPE_NAME: &'static str = "usize";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_i64().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromDatabaseValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromDatabaseValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromDatabaseValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromDatabaseValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_database_value(value: &DatabaseValue) -> Option<Self> {
        match value {
            DatabaseValue::Blob(bytes) => Some(bytes.clone()),
            DatabaseValue::Text(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }
}
