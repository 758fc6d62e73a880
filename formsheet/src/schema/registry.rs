//! Registry of entity schemas known to the application

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use super::models::{DeclaredType, EntitySchema, FieldDef, Literal};
use crate::error::SchemaError;

/// On-disk layout of a schema file: a list of `[[entity]]` tables
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntitySchema>,
}

/// Entity schemas keyed by case-insensitive name, in registration order
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<EntitySchema>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML schema document and register every entity in it
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(src).context("Failed to parse schema file")?;
        let mut registry = Self::new();
        for schema in file.entities {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Load a TOML schema file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let registry = Self::from_toml_str(&src)
            .with_context(|| format!("Invalid schema file: {}", path.display()))?;
        log::info!(
            "Loaded {} entity schema(s) from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Register an entity schema, replacing any previous one with the same name
    pub fn register(&mut self, schema: EntitySchema) -> Result<(), SchemaError> {
        check_schema(&schema)?;
        let key = schema.name.to_lowercase();
        match self.index.get(&key) {
            Some(&idx) => {
                log::debug!("Replacing schema '{}'", schema.name);
                self.schemas[idx] = schema;
            }
            None => {
                self.index.insert(key, self.schemas.len());
                self.schemas.push(schema);
            }
        }
        Ok(())
    }

    /// Look up a schema by name (case-insensitive)
    pub fn get(&self, name: &str) -> Result<&EntitySchema, SchemaError> {
        self.index
            .get(&name.to_lowercase())
            .map(|&idx| &self.schemas[idx])
            .ok_or_else(|| SchemaError::UnknownEntity {
                name: name.to_string(),
            })
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Reject schemas whose annotations can never be evaluated
fn check_schema(schema: &EntitySchema) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                entity: schema.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    for (pos, field) in schema.fields.iter().enumerate() {
        if let Some(ref pattern) = field.pattern {
            Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
                entity: schema.name.clone(),
                field: field.name.clone(),
                message: e.to_string(),
            })?;
        }
        if let Some(ref cond) = field.required_if {
            if !seen.contains(cond.field.as_str()) {
                return Err(SchemaError::UnknownSibling {
                    entity: schema.name.clone(),
                    field: field.name.clone(),
                    sibling: cond.field.clone(),
                });
            }
            if let Some(sibling) = schema.find_field(&cond.field) {
                check_literal(schema, field, sibling, &cond.equals)?;
            }
            // Siblings are read from the partially built record, so a later
            // sibling is always empty when this field is validated.
            if schema.fields[pos..].iter().any(|f| f.name == cond.field) {
                log::warn!(
                    "'{}.{}' depends on '{}', which is declared after it",
                    schema.name,
                    field.name,
                    cond.field
                );
            }
        }
    }
    Ok(())
}

/// Coerced sibling values are text, integers or booleans; any other pairing never matches
fn check_literal(
    schema: &EntitySchema,
    field: &FieldDef,
    sibling: &FieldDef,
    equals: &Literal,
) -> Result<(), SchemaError> {
    let expected = match (&sibling.declared, equals) {
        (DeclaredType::String, Literal::Text(_))
        | (DeclaredType::Int, Literal::Int(_))
        | (DeclaredType::Bool, Literal::Bool(_)) => return Ok(()),
        (DeclaredType::String, _) => "a string",
        (DeclaredType::Int, _) => "an integer",
        (DeclaredType::Bool, _) => "a boolean",
        _ => "comparable (sibling must be a string, integer or boolean field)",
    };
    Err(SchemaError::MismatchedLiteral {
        entity: schema.name.clone(),
        field: field.name.clone(),
        sibling: sibling.name.clone(),
        expected: expected.to_string(),
    })
}
