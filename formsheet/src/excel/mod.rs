//! Excel template export and import

pub mod codec;
pub mod import;
pub mod layout;
pub mod template;

pub use import::{CellError, ImportOptions, ImportOutcome, ImportReport, ImportValidator};
pub use layout::TemplateLayout;
pub use template::{Template, TemplateGenerator};
