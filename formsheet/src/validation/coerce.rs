//! Cell text -> typed value coercion

use chrono::NaiveDate;

use crate::error::CellConversionError;
use crate::schema::ScalarType;
use crate::types::Value;

/// Locale-dependent parts of coercion
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionRules {
    /// Uppercase markers read as `true` in boolean cells
    pub affirmative_markers: Vec<String>,
    /// chrono formats tried in order for date cells
    pub date_formats: Vec<String>,
}

impl Default for CoercionRules {
    fn default() -> Self {
        CoercionRules {
            affirmative_markers: ["O", "OUI", "Y", "YES", "TRUE", "1"]
                .into_iter()
                .map(String::from)
                .collect(),
            date_formats: ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl CoercionRules {
    pub fn is_affirmative(&self, text: &str) -> bool {
        let text = text.trim();
        self.affirmative_markers
            .iter()
            .any(|m| m.eq_ignore_ascii_case(text))
    }

    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    }
}

/// Coerce raw cell text to the field's scalar type.
///
/// Empty integers become `0`, empty text and dates become null, and any
/// boolean text that is not an affirmative marker is `false`.
pub fn coerce(
    text: &str,
    scalar: ScalarType,
    rules: &CoercionRules,
) -> Result<Value, CellConversionError> {
    let normalized = text.trim().to_uppercase();

    match scalar {
        ScalarType::Text => {
            if normalized.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Text(normalized))
            }
        }

        ScalarType::Integer => {
            if normalized.is_empty() {
                return Ok(Value::Int(0));
            }
            normalized
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| conversion_error(text, scalar))
        }

        ScalarType::Boolean => Ok(Value::Bool(rules.is_affirmative(&normalized))),

        ScalarType::Date => {
            if normalized.is_empty() {
                return Ok(Value::Null);
            }
            rules
                .parse_date(text)
                .map(Value::Date)
                .ok_or_else(|| conversion_error(text, scalar))
        }
    }
}

fn conversion_error(text: &str, expected: ScalarType) -> CellConversionError {
    CellConversionError {
        text: text.trim().to_string(),
        expected,
    }
}
