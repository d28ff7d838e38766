use std::fmt;

use super::FieldType;

/// A typed value stored in one position of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// 32-bit signed integer
    Int(i32),

    /// String value
    Str(String),
}

impl Field {
    /// Returns true if this value can be stored in a field of type `ty`.
    pub fn matches(&self, ty: &FieldType) -> bool {
        matches!(
            (self, ty),
            (Field::Int(_), FieldType::Int) | (Field::Str(_), FieldType::Str(_))
        )
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            Field::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            Field::Int(_) => None,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Int(_) => "INT",
            Field::Str(_) => "STRING",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Str(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Str(s)
    }
}
