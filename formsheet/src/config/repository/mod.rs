//! Repository layer for database operations

pub mod records;

pub use records::{SqliteSink, connect, ensure_tables, load_references};
