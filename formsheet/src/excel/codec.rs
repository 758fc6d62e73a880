//! Spreadsheet codec: xlsx bytes <-> in-memory sheets

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use super::layout::NAME_ROW;
use crate::error::CodecError;

/// The data sheet of a decoded workbook.
///
/// Owned by the single validation pass that decoded it.
#[derive(Debug, Clone)]
pub struct DataSheet {
    pub name: String,
    range: Range<Data>,
}

impl DataSheet {
    /// Text of a cell at an absolute 0-based position, empty if missing
    pub fn cell_text(&self, row: u32, col: u32) -> String {
        self.range
            .get_value((row, col))
            .map(cell_text)
            .unwrap_or_default()
    }

    /// Last row holding any cell, 0-based
    pub fn last_used_row(&self) -> Option<u32> {
        self.range.end().map(|(row, _)| row)
    }

    /// Last column holding any cell, 0-based
    pub fn last_used_col(&self) -> Option<u32> {
        self.range.end().map(|(_, col)| col)
    }

    /// Map field name -> column, read from the hidden name row
    pub fn name_columns(&self) -> HashMap<String, u32> {
        let mut columns = HashMap::new();
        let Some(last_col) = self.last_used_col() else {
            return columns;
        };
        for col in 0..=last_col {
            let name = self.cell_text(NAME_ROW, col);
            let name = name.trim();
            if !name.is_empty() {
                // first occurrence wins
                columns.entry(name.to_string()).or_insert(col);
            }
        }
        columns
    }
}

/// Decode xlsx bytes, returning the first sheet as the data sheet
pub fn decode(bytes: &[u8]) -> Result<DataSheet, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::NotASpreadsheet("empty content".into()));
    }

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| CodecError::NotASpreadsheet(e.to_string()))?;

    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CodecError::NotASpreadsheet("workbook has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| CodecError::NotASpreadsheet(format!("failed to read sheet '{}': {}", name, e)))?;

    log::debug!(
        "Decoded sheet '{}' ({} rows x {} columns)",
        name,
        range.height(),
        range.width()
    );

    Ok(DataSheet { name, range })
}

/// Serialize a finished workbook
pub fn encode(workbook: &mut Workbook) -> Result<Vec<u8>, CodecError> {
    Ok(workbook.save_to_buffer()?)
}

/// Textual form of a cell as an author would have typed it
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole numbers inside the i64 range print without a fraction
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
