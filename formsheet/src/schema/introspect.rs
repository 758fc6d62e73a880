//! Schema introspection: entity schema -> ordered field descriptors
//!
//! Introspection never fails. Fields whose type cannot be represented in a
//! spreadsheet are returned with `scalar_type: None` and skipped downstream.

use regex::Regex;

use super::descriptor::{Constraint, FieldDescriptor, FieldKind, Pattern, ScalarType};
use super::models::{DeclaredType, EntitySchema, FieldDef, Literal};
use crate::error::SchemaError;
use crate::types::Value;

/// Name of the primary key field; foreign keys end with it
pub const KEY_SENTINEL: &str = "id";

/// Describe every declared field of an entity, in declaration order
pub fn describe_fields(schema: &EntitySchema) -> Vec<FieldDescriptor> {
    schema
        .fields
        .iter()
        .map(|field| describe_field(&schema.name, field))
        .collect()
}

/// Descriptors the template and importer work with, in column order
pub fn exportable_fields(descriptors: &[FieldDescriptor]) -> Vec<&FieldDescriptor> {
    descriptors.iter().filter(|d| d.is_exportable()).collect()
}

fn describe_field(entity: &str, field: &FieldDef) -> FieldDescriptor {
    let kind = classify_kind(&field.name);
    let scalar_type = scalar_type(&field.declared);
    let enumerated_values = if field.values.is_empty() {
        None
    } else {
        Some(field.values.clone())
    };

    FieldDescriptor {
        name: field.name.clone(),
        kind,
        scalar_type,
        display_name: field
            .display_name
            .clone()
            .unwrap_or_else(|| field.name.clone()),
        required: field.required,
        enumerated_values,
        constraints: collect_constraints(entity, field),
        declared: field.declared.clone(),
    }
}

/// Classify a field by name against the key sentinel.
///
/// `id` is the primary key. `customer_id` and `customerId` are foreign keys:
/// the sentinel must close the name at a word boundary, so `valid` or `paid`
/// stay scalar.
pub fn classify_kind(name: &str) -> FieldKind {
    if name.eq_ignore_ascii_case(KEY_SENTINEL) {
        return FieldKind::PrimaryKey;
    }
    match foreign_key_prefix(name) {
        Some(_) => FieldKind::ForeignKey,
        None => FieldKind::Scalar,
    }
}

/// Prefix of a foreign key name, i.e. the expected navigation field name
pub fn foreign_key_prefix(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(KEY_SENTINEL.len())?;
    if split == 0 || !name.is_char_boundary(split) {
        return None;
    }
    let (prefix, suffix) = name.split_at(split);
    if !suffix.eq_ignore_ascii_case(KEY_SENTINEL) {
        return None;
    }

    if let Some(stripped) = prefix.strip_suffix('_') {
        return (!stripped.is_empty()).then_some(stripped);
    }

    // camelCase boundary: "customerId"
    let boundary = suffix.starts_with(|c: char| c.is_ascii_uppercase())
        && prefix.ends_with(|c: char| c.is_lowercase() || c.is_ascii_digit());
    boundary.then_some(prefix)
}

/// Entity referenced by a foreign key, read from its navigation sibling.
///
/// `customer_id` is resolved through a sibling named `customer` whose
/// declared type is `Entity(..)`.
pub fn navigation_target<'s>(
    schema: &EntitySchema,
    descriptors: &'s [FieldDescriptor],
    field: &FieldDescriptor,
) -> Result<&'s str, SchemaError> {
    let missing = || SchemaError::MissingNavigation {
        entity: schema.name.clone(),
        field: field.name.clone(),
    };
    let prefix = foreign_key_prefix(&field.name).ok_or_else(missing)?;

    descriptors
        .iter()
        .find_map(|d| match &d.declared {
            DeclaredType::Entity(target) if d.name.eq_ignore_ascii_case(prefix) => {
                Some(target.as_str())
            }
            _ => None,
        })
        .ok_or_else(missing)
}

/// Map a declared runtime type onto a spreadsheet scalar type
pub fn scalar_type(declared: &DeclaredType) -> Option<ScalarType> {
    match declared {
        DeclaredType::String => Some(ScalarType::Text),
        DeclaredType::Int => Some(ScalarType::Integer),
        DeclaredType::Bool => Some(ScalarType::Boolean),
        DeclaredType::Date => Some(ScalarType::Date),
        DeclaredType::Decimal
        | DeclaredType::Entity(_)
        | DeclaredType::Collection(_)
        | DeclaredType::Other(_) => None,
    }
}

fn collect_constraints(entity: &str, field: &FieldDef) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    if field.required {
        constraints.push(Constraint::Required);
    }
    if let Some(max) = field.max_length {
        constraints.push(Constraint::MaxLength { max });
    }
    if let Some(min) = field.min_length {
        constraints.push(Constraint::MinLength { min });
    }
    if let Some(ref source) = field.pattern {
        match Regex::new(source) {
            Ok(regex) => constraints.push(Constraint::Pattern {
                pattern: Pattern(regex),
            }),
            Err(e) => log::warn!(
                "Ignoring invalid pattern on '{}.{}': {}",
                entity,
                field.name,
                e
            ),
        }
    }
    if let Some(ref range) = field.range {
        constraints.push(Constraint::Range {
            min: range.min,
            max: range.max,
        });
    }
    if let Some(ref range) = field.date_range {
        constraints.push(Constraint::DateRange {
            min: range.min,
            max: range.max,
        });
    }
    if let Some(ref cond) = field.required_if {
        constraints.push(Constraint::RequiredIf {
            field: cond.field.clone(),
            equals: literal_value(&cond.equals),
        });
    }
    if !field.values.is_empty() {
        constraints.push(Constraint::OneOf {
            values: field.values.clone(),
        });
    }

    constraints
}

/// Normalize a literal the way the importer normalizes cell text
fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Text(s) => Value::Text(s.trim().to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> EntitySchema {
        EntitySchema::new("Person")
            .identifier("last_name")
            .field(FieldDef::new("id", DeclaredType::Int))
            .field(
                FieldDef::new("last_name", DeclaredType::String)
                    .display_name("Last name")
                    .required()
                    .max_length(40),
            )
            .field(FieldDef::new("customer_id", DeclaredType::Int))
            .field(FieldDef::new(
                "customer",
                DeclaredType::Entity("Customer".into()),
            ))
            .field(FieldDef::new("salary", DeclaredType::Decimal))
            .field(FieldDef::new("is_minor", DeclaredType::Bool))
            .field(
                FieldDef::new("age", DeclaredType::Int)
                    .required_if("is_minor", Literal::Bool(true)),
            )
    }

    #[test]
    fn test_classify_kind() {
        assert_eq!(classify_kind("id"), FieldKind::PrimaryKey);
        assert_eq!(classify_kind("Id"), FieldKind::PrimaryKey);
        assert_eq!(classify_kind("customer_id"), FieldKind::ForeignKey);
        assert_eq!(classify_kind("customerId"), FieldKind::ForeignKey);
        assert_eq!(classify_kind("valid"), FieldKind::Scalar);
        assert_eq!(classify_kind("paid"), FieldKind::Scalar);
        assert_eq!(classify_kind("_id"), FieldKind::Scalar);
        assert_eq!(classify_kind("name"), FieldKind::Scalar);
    }

    #[test]
    fn test_foreign_key_prefix() {
        assert_eq!(foreign_key_prefix("customer_id"), Some("customer"));
        assert_eq!(foreign_key_prefix("customerId"), Some("customer"));
        assert_eq!(foreign_key_prefix("paid"), None);
    }

    #[test]
    fn test_describe_fields_keeps_declaration_order() {
        let names: Vec<_> = describe_fields(&person())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec!["id", "last_name", "customer_id", "customer", "salary", "is_minor", "age"]
        );
    }

    #[test]
    fn test_unsupported_types_are_not_exportable() {
        let descriptors = describe_fields(&person());
        let exported: Vec<_> = exportable_fields(&descriptors)
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(
            exported,
            vec!["last_name", "customer_id", "is_minor", "age"]
        );
    }

    #[test]
    fn test_describe_fields_is_deterministic() {
        let schema = person();
        assert_eq!(describe_fields(&schema), describe_fields(&schema));
    }

    #[test]
    fn test_constraints_and_labels() {
        let descriptors = describe_fields(&person());
        let last_name = &descriptors[1];
        assert_eq!(last_name.display_name, "Last name");
        assert_eq!(last_name.header_label(), "Last name *");
        assert_eq!(
            last_name.constraints,
            vec![Constraint::Required, Constraint::MaxLength { max: 40 }]
        );

        let age = &descriptors[6];
        assert_eq!(age.display_name, "age");
        assert_eq!(
            age.constraints,
            vec![Constraint::RequiredIf {
                field: "is_minor".into(),
                equals: Value::Bool(true),
            }]
        );
    }

    #[test]
    fn test_navigation_target() {
        let schema = person();
        let descriptors = describe_fields(&schema);
        assert_eq!(
            navigation_target(&schema, &descriptors, &descriptors[2]),
            Ok("Customer")
        );

        let orphan = EntitySchema::new("Orphan").field(FieldDef::new("owner_id", DeclaredType::Int));
        let descriptors = describe_fields(&orphan);
        assert!(matches!(
            navigation_target(&orphan, &descriptors, &descriptors[0]),
            Err(SchemaError::MissingNavigation { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let schema = EntitySchema::new("Broken")
            .field(FieldDef::new("code", DeclaredType::String).pattern("(unclosed"));
        let descriptors = describe_fields(&schema);
        assert!(descriptors[0].constraints.is_empty());
    }
}
