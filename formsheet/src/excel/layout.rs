//! Fixed row/column layout shared by the template writer and the importer
//!
//! All coordinates are 0-based, as used by rust_xlsxwriter and calamine.

/// Hidden row holding field names, used to re-match columns on import
pub const NAME_ROW: u32 = 0;
/// Row holding type labels
pub const TYPE_ROW: u32 = 1;
/// Row holding display labels and the required marker
pub const LABEL_ROW: u32 = 2;
/// First editable row
pub const FIRST_DATA_ROW: u32 = 3;

/// Default last data row (1-based spreadsheet row number)
pub const DEFAULT_ROW_LIMIT: u32 = 500;

/// Name of the hidden pick-list source sheet
pub const OPTIONS_SHEET: &str = "Options";

/// Excel caps sheet names at 31 characters
const MAX_SHEET_NAME: usize = 31;

/// Template dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateLayout {
    /// Last data row, as a 1-based spreadsheet row number
    pub row_limit: u32,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        TemplateLayout {
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

impl TemplateLayout {
    pub fn new(row_limit: u32) -> Self {
        // at least one data row
        TemplateLayout {
            row_limit: row_limit.max(FIRST_DATA_ROW + 1),
        }
    }

    /// Last data row, 0-based
    pub fn last_data_row(&self) -> u32 {
        self.row_limit - 1
    }

    /// Number of editable rows
    pub fn data_rows(&self) -> u32 {
        self.row_limit - FIRST_DATA_ROW
    }
}

/// Data sheet name for an entity, avoiding the options sheet name
pub fn data_sheet_name(entity: &str) -> String {
    let cleaned: String = entity
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME)
        .collect();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(OPTIONS_SHEET) {
        format!("{}_data", cleaned)
    } else {
        cleaned
    }
}
