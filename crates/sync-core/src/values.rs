//! Value representations shared by sources, the load engine and graph sinks.
//!
//! Two layers exist:
//!
//! - [`SourceValue`] is what a relational source hands over. It may still hold
//!   an arbitrary-precision decimal.
//! - [`GraphValue`] is the portable scalar a graph store accepts as a node
//!   property. Converting between the two is the job of the value normalizer
//!   in the root crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Raw column value as read from a relational source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    /// SQL NULL
    Null,

    /// Any integer column, widened to 64 bits
    Int(i64),

    /// Floating point column
    Float(f64),

    /// Fixed-precision NUMERIC / DECIMAL column
    Decimal(Decimal),

    /// Character data, and anything rendered as text
    String(String),

    /// Boolean column
    Bool(bool),

    /// Timestamp, normalized to UTC
    DateTime(DateTime<Utc>),
}

impl SourceValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for SourceValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SourceValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for SourceValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for SourceValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for SourceValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for SourceValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for SourceValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DateTime<Utc>> for SourceValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<SourceValue>> From<Option<T>> for SourceValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Portable scalar stored as a graph node property.
///
/// Equality and hashing treat floats by bit pattern, which lets a
/// `GraphValue` take part in a node identity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphValue {
    /// Null value. Never persisted as a property.
    Null,

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Boolean value
    Bool(bool),

    /// Date/time in UTC
    DateTime(DateTime<Utc>),

    /// String value
    String(String),
}

impl GraphValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for GraphValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for GraphValue {}

impl Hash for GraphValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Bool(b) => b.hash(state),
            Self::DateTime(dt) => dt.hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for GraphValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for GraphValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for GraphValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for GraphValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for GraphValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for GraphValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}
