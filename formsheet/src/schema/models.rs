//! Declarative entity schemas
//!
//! An `EntitySchema` is what an entity type exposes about itself: its fields
//! in declaration order, their runtime types and the annotations attached to
//! them. Schemas are built in code or deserialized from TOML.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Runtime type of a declared field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    String,
    Int,
    Bool,
    Date,
    Decimal,
    /// Navigation field holding another entity (e.g. `customer: Customer`)
    Entity(String),
    /// Collection of another entity
    Collection(String),
    Other(String),
}

/// Literal compared against a sibling value by `required_if`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Inclusive integer bounds
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntRange {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

/// Inclusive date bounds
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    #[serde(default)]
    pub min: Option<NaiveDate>,
    #[serde(default)]
    pub max: Option<NaiveDate>,
}

/// Field is required only while a sibling holds a given value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredIf {
    pub field: String,
    pub equals: Literal,
}

/// One declared field and its annotations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub declared: DeclaredType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<IntRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<RequiredIf>,
    /// Enumerated pick-list values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        FieldDef {
            name: name.into(),
            declared,
            display_name: None,
            required: false,
            max_length: None,
            min_length: None,
            pattern: None,
            range: None,
            date_range: None,
            required_if: None,
            values: Vec::new(),
        }
    }

    pub fn display_name(mut self, label: impl Into<String>) -> Self {
        self.display_name = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.range = Some(IntRange { min, max });
        self
    }

    pub fn date_range(mut self, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange { min, max });
        self
    }

    pub fn required_if(mut self, field: impl Into<String>, equals: Literal) -> Self {
        self.required_if = Some(RequiredIf {
            field: field.into(),
            equals,
        });
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Complete description of an entity type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    /// Storage table name, defaults to the snake_case entity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Field whose value labels this entity in reference pick-lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_field: Option<String>,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        EntitySchema {
            name: name.into(),
            table: None,
            identifier_field: None,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = Some(field.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Find a declared field by name
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Storage table name
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| to_snake_case(&self.name))
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
