//! Cell value representation shared by the importer, the validator and the sinks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::ScalarType;

/// A coerced field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Null/empty value
    Null,
    /// Text value (already trimmed and uppercased by the importer)
    Text(String),
    /// Whole number, also used for foreign keys
    Int(i64),
    /// Boolean
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this value can be stored in a slot of the given scalar type.
    /// Null fits every slot.
    pub fn fits(&self, scalar: ScalarType) -> bool {
        matches!(
            (self, scalar),
            (Value::Null, _)
                | (Value::Text(_), ScalarType::Text)
                | (Value::Int(_), ScalarType::Integer)
                | (Value::Bool(_), ScalarType::Boolean)
                | (Value::Date(_), ScalarType::Date)
        )
    }

    /// Convert to JSON value for reports and record dumps
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::json!(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}
