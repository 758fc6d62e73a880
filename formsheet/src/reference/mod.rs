//! Foreign reference identifiers
//!
//! A foreign key column cannot show bare numeric keys to a spreadsheet
//! author, so every referenced instance is rendered as `"<id> - <label>"`,
//! where the label comes from the referenced entity's identifier field.
//! Parsing only recovers the leading key; whether the referenced row still
//! exists is left to the persistence sink.

mod memory;

pub use memory::MemoryReferences;

use anyhow::{Context, Result};

use crate::error::{MalformedReferenceError, SchemaError};
use crate::schema::{DeclaredType, EntitySchema, FieldKind, classify_kind};

/// Separator between key and label in an identifier string
pub const IDENTIFIER_SEPARATOR: &str = " - ";

/// One existing instance of a referenced entity
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub id: i64,
    pub label: String,
}

/// Supplies the current instances of a referenced entity type
pub trait ReferenceSource {
    /// All instances of `entity`, labelled with the value of `label_field`
    fn instances(&self, entity: &EntitySchema, label_field: &str) -> Result<Vec<ReferenceRow>>;
}

/// Field nominated to label references to this entity.
///
/// Falls back to the first plain text field when the schema names none.
pub fn label_field(schema: &EntitySchema) -> Result<&str, SchemaError> {
    if let Some(ref field) = schema.identifier_field {
        return schema
            .find_field(field)
            .map(|f| f.name.as_str())
            .ok_or_else(|| SchemaError::MissingIdentifierField {
                entity: schema.name.clone(),
            });
    }

    schema
        .fields
        .iter()
        .find(|f| f.declared == DeclaredType::String && classify_kind(&f.name) == FieldKind::Scalar)
        .map(|f| f.name.as_str())
        .ok_or_else(|| SchemaError::MissingIdentifierField {
            entity: schema.name.clone(),
        })
}

/// Render a key and label as an identifier string
pub fn format_identifier(id: i64, label: &str) -> String {
    format!("{}{}{}", id, IDENTIFIER_SEPARATOR, label)
}

/// Identifier strings for every instance of `referenced`, ordered by key
pub fn build_identifiers(
    source: &dyn ReferenceSource,
    referenced: &EntitySchema,
) -> Result<Vec<String>> {
    let label_field = label_field(referenced)?;
    let mut rows = source
        .instances(referenced, label_field)
        .with_context(|| format!("Failed to load '{}' references", referenced.name))?;
    rows.sort_by_key(|r| r.id);

    log::debug!(
        "Built {} identifier(s) for '{}' labelled by '{}'",
        rows.len(),
        referenced.name,
        label_field
    );

    Ok(rows
        .iter()
        .map(|r| format_identifier(r.id, &r.label))
        .collect())
}

/// Recover the primary key from an identifier string.
///
/// The key is the token before the first run of whitespace.
pub fn parse_identifier(text: &str) -> Result<i64, MalformedReferenceError> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(|| MalformedReferenceError {
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn customer() -> EntitySchema {
        EntitySchema::new("Customer")
            .identifier("name")
            .field(FieldDef::new("id", DeclaredType::Int))
            .field(FieldDef::new("code", DeclaredType::String))
            .field(FieldDef::new("name", DeclaredType::String))
    }

    #[test]
    fn test_identifier_round_trip() {
        let text = format_identifier(7, "Smith");
        assert_eq!(text, "7 - Smith");
        assert_eq!(parse_identifier(&text), Ok(7));
    }

    #[test]
    fn test_parse_identifier_rejects_non_numeric_key() {
        assert_eq!(
            parse_identifier("abc - Smith"),
            Err(MalformedReferenceError {
                text: "abc - Smith".into()
            })
        );
        assert!(parse_identifier("").is_err());
        assert!(parse_identifier("   ").is_err());
    }

    #[test]
    fn test_parse_identifier_splits_on_first_whitespace_run() {
        assert_eq!(parse_identifier("  12\t-  Van der Berg"), Ok(12));
        assert_eq!(parse_identifier("42"), Ok(42));
        assert!(parse_identifier("7-Smith").is_err());
    }

    #[test]
    fn test_label_field_prefers_annotation() {
        assert_eq!(label_field(&customer()), Ok("name"));

        let mut unannotated = customer();
        unannotated.identifier_field = None;
        assert_eq!(label_field(&unannotated), Ok("code"));

        let no_text = EntitySchema::new("Counter").field(FieldDef::new("id", DeclaredType::Int));
        assert!(matches!(
            label_field(&no_text),
            Err(SchemaError::MissingIdentifierField { .. })
        ));
    }

    #[test]
    fn test_build_identifiers_sorted_by_key() {
        let mut refs = MemoryReferences::new();
        refs.insert("Customer", 9, [("name", "Zed")]);
        refs.insert("Customer", 7, [("name", "Smith")]);

        let ids = build_identifiers(&refs, &customer()).unwrap();
        assert_eq!(ids, vec!["7 - Smith", "9 - Zed"]);
    }
}
