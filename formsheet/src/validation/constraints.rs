//! Generic evaluation of declarative field constraints
//!
//! Emptiness is judged on the raw cell text, so `Required` rejects an empty
//! integer cell even though it coerces to `0`. Value rules (length, pattern,
//! ranges, options) only apply to non-empty cells.

use crate::error::ConstraintViolation;
use crate::schema::{Constraint, FieldDescriptor};
use crate::types::{Record, Value};

/// Check every constraint of `field` against a coerced cell.
///
/// `record` is the partially built record for the current row; conditional
/// rules read sibling values already assigned on it.
pub fn check_constraints(
    field: &FieldDescriptor,
    raw: &str,
    value: &Value,
    record: &Record,
) -> Result<(), ConstraintViolation> {
    let empty = raw.trim().is_empty();

    for constraint in &field.constraints {
        if let Err(message) = check_one(constraint, raw, value, empty, record) {
            return Err(ConstraintViolation {
                field: field.display_name.clone(),
                message,
            });
        }
    }
    Ok(())
}

fn check_one(
    constraint: &Constraint,
    raw: &str,
    value: &Value,
    empty: bool,
    record: &Record,
) -> Result<(), String> {
    match constraint {
        Constraint::Required => {
            if empty {
                return Err("Value required".into());
            }
        }

        Constraint::RequiredIf { field, equals } => {
            let sibling = record.get(field).unwrap_or(&Value::Null);
            if empty && sibling == equals {
                return Err(format!("Value required when '{}' is {}", field, equals));
            }
        }

        _ if empty => {}

        Constraint::MaxLength { max } => {
            let len = text_len(raw, value);
            if len > *max {
                return Err(format!("At most {} characters allowed (got {})", max, len));
            }
        }

        Constraint::MinLength { min } => {
            let len = text_len(raw, value);
            if len < *min {
                return Err(format!("At least {} characters required (got {})", min, len));
            }
        }

        Constraint::Pattern { pattern } => {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| raw.trim().to_string());
            if !pattern.0.is_match(&text) {
                return Err(format!("'{}' does not match {}", text, pattern.0.as_str()));
            }
        }

        Constraint::Range { min, max } => {
            if let Some(n) = value.as_int() {
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return Err(format!("{} is outside {}", n, bounds(min, max)));
                }
            }
        }

        Constraint::DateRange { min, max } => {
            if let Some(d) = value.as_date() {
                if min.is_some_and(|m| d < m) || max.is_some_and(|m| d > m) {
                    return Err(format!("{} is outside {}", d, bounds(min, max)));
                }
            }
        }

        Constraint::OneOf { values } => {
            // options are folded the same way `coerce` folds cell text
            let text = match value {
                Value::Null => return Ok(()),
                other => other.to_string().to_uppercase(),
            };
            if !values.iter().any(|v| v.trim().to_uppercase() == text) {
                return Err(format!("'{}' is not one of the listed options", raw.trim()));
            }
        }
    }
    Ok(())
}

fn text_len(raw: &str, value: &Value) -> usize {
    match value {
        Value::Text(s) => s.chars().count(),
        _ => raw.trim().chars().count(),
    }
}

fn bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
        (Some(lo), None) => format!("[{}, ..]", lo),
        (None, Some(hi)) => format!("[.., {}]", hi),
        (None, None) => "any range".to_string(),
    }
}
