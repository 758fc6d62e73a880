//! Entity schemas and their introspection into field descriptors

mod descriptor;
mod introspect;
mod models;
mod registry;

pub use descriptor::*;
pub use introspect::{
    KEY_SENTINEL, classify_kind, describe_fields, exportable_fields, foreign_key_prefix,
    navigation_target, scalar_type,
};
pub use models::*;
pub use registry::SchemaRegistry;
