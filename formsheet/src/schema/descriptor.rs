//! Field descriptors derived from entity schemas

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use super::models::DeclaredType;
use crate::types::Value;

/// Role a field plays in its entity
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FieldKind {
    PrimaryKey,
    ForeignKey,
    Scalar,
}

/// Spreadsheet-compatible value types
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Text,
    Integer,
    Boolean,
    Date,
}

impl ScalarType {
    /// Label written in the template's type row
    pub fn label(&self) -> &'static str {
        match self {
            ScalarType::Text => "Text",
            ScalarType::Integer => "Integer",
            ScalarType::Boolean => "Boolean",
            ScalarType::Date => "Date",
        }
    }
}

/// Compiled regular expression, compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern(pub Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

/// Declarative validation rule attached to a field
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Constraint {
    Required,
    MaxLength { max: usize },
    MinLength { min: usize },
    Pattern { pattern: Pattern },
    Range { min: Option<i64>, max: Option<i64> },
    DateRange {
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    },
    /// Required while `field` currently holds `equals` on the same record
    RequiredIf { field: String, equals: Value },
    /// Value must be one of the enumerated options (case-insensitive)
    OneOf { values: Vec<String> },
}

/// Derived metadata about one field, recomputed per introspection call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// `None` marks the field as not exportable
    pub scalar_type: Option<ScalarType>,
    pub display_name: String,
    pub required: bool,
    pub enumerated_values: Option<Vec<String>>,
    pub constraints: Vec<Constraint>,
    /// Declared runtime type, kept so navigation siblings can be located
    pub declared: DeclaredType,
}

impl FieldDescriptor {
    /// Whether the template and importer handle this field
    pub fn is_exportable(&self) -> bool {
        self.kind != FieldKind::PrimaryKey && self.scalar_type.is_some()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.kind == FieldKind::ForeignKey
    }

    /// Whether the data column carries a pick-list
    pub fn has_pick_list(&self) -> bool {
        self.is_foreign_key() || self.enumerated_values.is_some()
    }

    /// Label written in the template's type row
    pub fn type_label(&self) -> &'static str {
        if self.is_foreign_key() {
            "Reference"
        } else if self.enumerated_values.is_some() {
            "List"
        } else {
            self.scalar_type.map(|s| s.label()).unwrap_or("Unsupported")
        }
    }

    /// Label written in the template's display row, with the required marker
    pub fn header_label(&self) -> String {
        if self.required {
            format!("{} *", self.display_name)
        } else {
            self.display_name.clone()
        }
    }
}
