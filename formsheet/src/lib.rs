//! Excel data-entry templates generated from entity schemas, and the
//! validating import that turns filled templates back into records.

pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod reference;
pub mod schema;
pub mod service;
pub mod sink;
pub mod types;
pub mod upload;
pub mod validation;

pub use error::{
    CellConversionError, CodecError, ConstraintViolation, MalformedReferenceError,
    PersistenceError, SchemaError, UploadFormatError,
};
pub use service::{ImportResponse, Workbench};
