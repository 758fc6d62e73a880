//! Records built from validated spreadsheet rows

use std::collections::HashMap;

use super::Value;
use crate::schema::{FieldDescriptor, ScalarType};

/// Error assigning a value through a record's setter table
#[derive(Debug, Clone, PartialEq)]
pub enum SetFieldError {
    UnknownField { field: String },
    TypeMismatch { field: String, expected: ScalarType },
}

impl std::fmt::Display for SetFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetFieldError::UnknownField { field } => write!(f, "Unknown field '{}'", field),
            SetFieldError::TypeMismatch { field, expected } => {
                write!(f, "Field '{}' expects a {} value", field, expected.label())
            }
        }
    }
}

impl std::error::Error for SetFieldError {}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: String,
    scalar: ScalarType,
    value: Value,
}

/// One entity instance, with a typed slot per exportable field
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    slots: Vec<Slot>,
    /// Setter table: field name -> slot index
    setters: HashMap<String, usize>,
}

impl Record {
    /// Blank record with every field set to null
    pub fn blank(entity: impl Into<String>, fields: &[&FieldDescriptor]) -> Self {
        let mut slots = Vec::with_capacity(fields.len());
        let mut setters = HashMap::with_capacity(fields.len());
        for field in fields {
            let Some(scalar) = field.scalar_type else {
                continue;
            };
            setters.insert(field.name.clone(), slots.len());
            slots.push(Slot {
                name: field.name.clone(),
                scalar,
                value: Value::Null,
            });
        }
        Record {
            entity: entity.into(),
            slots,
            setters,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Assign a value, checking it against the field's scalar type
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), SetFieldError> {
        let idx = *self
            .setters
            .get(field)
            .ok_or_else(|| SetFieldError::UnknownField {
                field: field.to_string(),
            })?;
        let slot = &mut self.slots[idx];
        if !value.fits(slot.scalar) {
            return Err(SetFieldError::TypeMismatch {
                field: field.to_string(),
                expected: slot.scalar,
            });
        }
        slot.value = value;
        Ok(())
    }

    /// Current value of a field, `None` if the record has no such field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.setters.get(field).map(|&idx| &self.slots[idx].value)
    }

    /// Field names and values in column order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|s| (s.name.as_str(), &s.value))
    }

    /// JSON object of the record's fields
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .slots
            .iter()
            .map(|s| (s.name.clone(), s.value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
