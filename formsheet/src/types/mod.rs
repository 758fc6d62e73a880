//! Core value and record types

mod record;
mod value;

pub use record::*;
pub use value::*;
