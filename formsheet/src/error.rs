//! Error taxonomy for template export and spreadsheet import
//!
//! Row/cell level failures (`MalformedReferenceError`, `CellConversionError`,
//! `ConstraintViolation`) never escape an import call; they are collected as
//! cell errors and turned into an annotated workbook. The remaining errors
//! abort the call they occur in.

use crate::schema::ScalarType;

/// Problems with an entity schema, fatal to the export/import call
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// No schema registered under this name
    UnknownEntity { name: String },
    /// Entity has no exportable field once keys and unsupported types are removed
    NoUsableFields { entity: String },
    /// Foreign key field without a sibling navigation field naming its target
    MissingNavigation { entity: String, field: String },
    /// Referenced entity has no field that can label its identifiers
    MissingIdentifierField { entity: String },
    /// Declared field name appears twice
    DuplicateField { entity: String, field: String },
    /// Pattern annotation is not a valid regular expression
    InvalidPattern {
        entity: String,
        field: String,
        message: String,
    },
    /// Conditional-required annotation points at a field that does not exist
    UnknownSibling {
        entity: String,
        field: String,
        sibling: String,
    },
    /// `required_if` literal can never equal a value of the sibling's type
    MismatchedLiteral {
        entity: String,
        field: String,
        sibling: String,
        expected: String,
    },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::UnknownEntity { name } => {
                write!(f, "Unknown entity type '{}'", name)
            }
            SchemaError::NoUsableFields { entity } => {
                write!(f, "Entity '{}' has no fields that can be exported", entity)
            }
            SchemaError::MissingNavigation { entity, field } => write!(
                f,
                "Foreign key '{}.{}' has no navigation field naming its target entity",
                entity, field
            ),
            SchemaError::MissingIdentifierField { entity } => write!(
                f,
                "Entity '{}' has no identifier field to label references with",
                entity
            ),
            SchemaError::DuplicateField { entity, field } => {
                write!(f, "Field '{}' is declared twice on '{}'", field, entity)
            }
            SchemaError::InvalidPattern {
                entity,
                field,
                message,
            } => write!(
                f,
                "Invalid pattern on '{}.{}': {}",
                entity, field, message
            ),
            SchemaError::UnknownSibling {
                entity,
                field,
                sibling,
            } => write!(
                f,
                "'{}.{}' is conditionally required on unknown field '{}'",
                entity, field, sibling
            ),
            SchemaError::MismatchedLiteral {
                entity,
                field,
                sibling,
                expected,
            } => write!(
                f,
                "'{}.{}' compares '{}' against a literal that is not {}",
                entity, field, sibling, expected
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Upload rejected before any decoding is attempted
#[derive(Debug, Clone, PartialEq)]
pub enum UploadFormatError {
    /// No file was supplied
    Missing,
    /// File content has zero length
    Empty { filename: String },
    /// File does not carry the `.xlsx` extension
    WrongExtension { filename: String },
}

impl std::fmt::Display for UploadFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadFormatError::Missing => write!(f, "No file was uploaded"),
            UploadFormatError::Empty { filename } => {
                write!(f, "Uploaded file '{}' is empty", filename)
            }
            UploadFormatError::WrongExtension { filename } => {
                write!(f, "Uploaded file '{}' is not an .xlsx workbook", filename)
            }
        }
    }
}

impl std::error::Error for UploadFormatError {}

/// Spreadsheet byte content could not be decoded or encoded
#[derive(Debug)]
pub enum CodecError {
    /// Bytes are not a well-formed xlsx workbook, or lack the expected sheet
    NotASpreadsheet(String),
    /// Writing the workbook failed
    Write(rust_xlsxwriter::XlsxError),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::NotASpreadsheet(reason) => {
                write!(f, "Not a spreadsheet: {}", reason)
            }
            CodecError::Write(e) => write!(f, "Failed to write workbook: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Write(e) => Some(e),
            CodecError::NotASpreadsheet(_) => None,
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for CodecError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        CodecError::Write(e)
    }
}

/// Foreign key cell whose leading token is not an integer key
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedReferenceError {
    pub text: String,
}

impl std::fmt::Display for MalformedReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid reference (expected '<id> - <label>')", self.text)
    }
}

impl std::error::Error for MalformedReferenceError {}

/// Scalar cell text that cannot be coerced to its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct CellConversionError {
    pub text: String,
    pub expected: ScalarType,
}

impl std::fmt::Display for CellConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid {}", self.text, self.expected.label().to_lowercase())
    }
}

impl std::error::Error for CellConversionError {}

/// Coerced value failing a declared constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConstraintViolation {}

/// The persistence sink rejected an already validated batch
#[derive(Debug)]
pub struct PersistenceError {
    pub entity: String,
    pub source: anyhow::Error,
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to persist '{}' records: {:#}", self.entity, self.source)
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
