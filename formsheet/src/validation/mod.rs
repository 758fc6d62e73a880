//! Per-field coercion and constraint checking

mod coerce;
mod constraints;

pub use coerce::{CoercionRules, coerce};
pub use constraints::check_constraints;
