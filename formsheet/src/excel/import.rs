//! Import validation: filled template -> records or an annotated workbook
//!
//! Columns are matched by the hidden field-name row, so authors may reorder
//! them. The first failing cell of a row marks the row invalid and stops
//! processing of that row. A submission is accepted only if every non-blank
//! row is valid; otherwise nothing is accepted and the workbook is rebuilt
//! with the failing cells filled red.

use anyhow::{Context, Result};
use serde::Serialize;

use super::codec::{self, DataSheet};
use super::layout::{FIRST_DATA_ROW, TemplateLayout};
use super::template::{SheetRow, TemplateGenerator};
use crate::error::SchemaError;
use crate::reference::{self, ReferenceSource};
use crate::schema::{FieldDescriptor, SchemaRegistry, describe_fields, exportable_fields};
use crate::types::{Record, Value};
use crate::validation::{CoercionRules, check_constraints, coerce};

/// Caller choices for one import
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Drop valid rows from the annotated workbook, leaving only failing ones
    pub discard_valid: bool,
}

/// One invalid cell, in 1-based spreadsheet coordinates of the submitted sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellError {
    pub row: u32,
    /// `None` when the field has no column in the submitted sheet
    pub column: Option<u32>,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.column {
            Some(column) => write!(
                f,
                "row {}, column {} ({}): {}",
                self.row, column, self.field, self.message
            ),
            None => write!(
                f,
                "row {}, missing column ({}): {}",
                self.row, self.field, self.message
            ),
        }
    }
}

/// Summary of an import pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub entity: String,
    pub rows_read: usize,
    pub rows_valid: usize,
    pub errors: Vec<CellError>,
}

impl ImportReport {
    pub fn rows_invalid(&self) -> usize {
        self.errors.len()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of an import pass
#[derive(Debug)]
pub enum ImportOutcome {
    /// Every row validated; records are ready for the persistence sink
    Accepted {
        records: Vec<Record>,
        report: ImportReport,
    },
    /// At least one row failed; nothing is accepted
    Rejected {
        workbook: Vec<u8>,
        report: ImportReport,
    },
}

/// Row as processed by the validator
struct ProcessedRow {
    /// Row in the submitted sheet, 0-based
    row: u32,
    /// Raw text per retained field
    values: Vec<String>,
    /// Failing field index and message
    error: Option<(usize, String)>,
}

/// Validates submitted templates against registered schemas
pub struct ImportValidator<'a> {
    registry: &'a SchemaRegistry,
    references: &'a dyn ReferenceSource,
    layout: TemplateLayout,
    rules: &'a CoercionRules,
}

impl<'a> ImportValidator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        references: &'a dyn ReferenceSource,
        layout: TemplateLayout,
        rules: &'a CoercionRules,
    ) -> Self {
        ImportValidator {
            registry,
            references,
            layout,
            rules,
        }
    }

    /// Validate xlsx bytes as a filled template of `entity`
    pub fn import(&self, bytes: &[u8], entity: &str, options: ImportOptions) -> Result<ImportOutcome> {
        let schema = self.registry.get(entity)?;
        let descriptors = describe_fields(schema);
        let fields = exportable_fields(&descriptors);
        if fields.is_empty() {
            return Err(SchemaError::NoUsableFields {
                entity: schema.name.clone(),
            }
            .into());
        }

        let sheet = codec::decode(bytes)?;
        let columns = locate_columns(&sheet, &fields);

        // Rows typed below the template's validated range are still read
        let last_row = match sheet.last_used_row() {
            Some(row) => row,
            None => FIRST_DATA_ROW.saturating_sub(1),
        };
        if last_row > self.layout.last_data_row() {
            log::debug!(
                "Sheet '{}' has rows up to {}, past the template limit of {}",
                sheet.name,
                last_row + 1,
                self.layout.last_data_row() + 1
            );
        }

        let mut report = ImportReport {
            entity: schema.name.clone(),
            ..ImportReport::default()
        };
        let mut records = Vec::new();
        let mut processed = Vec::new();

        for row in FIRST_DATA_ROW..=last_row {
            let values: Vec<String> = columns
                .iter()
                .map(|col| col.map(|c| sheet.cell_text(row, c)).unwrap_or_default())
                .collect();

            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            report.rows_read += 1;

            let mut record = Record::blank(&schema.name, &fields);
            let error = self.validate_row(&fields, &values, &mut record);

            match error {
                None => {
                    report.rows_valid += 1;
                    records.push(record);
                }
                Some((idx, ref message)) => {
                    report.errors.push(CellError {
                        row: row + 1,
                        column: columns[idx].map(|c| c + 1),
                        field: fields[idx].name.clone(),
                        message: message.clone(),
                    });
                }
            }
            processed.push(ProcessedRow { row, values, error });
        }

        if report.is_valid() {
            log::info!(
                "Import of '{}' accepted: {} record(s)",
                schema.name,
                records.len()
            );
            return Ok(ImportOutcome::Accepted { records, report });
        }

        log::info!(
            "Import of '{}' rejected: {} of {} row(s) invalid",
            schema.name,
            report.rows_invalid(),
            report.rows_read
        );

        let rows = annotated_rows(processed, options);
        let template = TemplateGenerator::new(self.registry, self.references, self.layout)
            .plan(schema)?;
        let workbook = template
            .render(&rows)
            .with_context(|| format!("Failed to write annotated '{}' workbook", schema.name))?;

        Ok(ImportOutcome::Rejected { workbook, report })
    }

    /// Convert, validate and assign one row, stopping at the first failure
    fn validate_row(
        &self,
        fields: &[&FieldDescriptor],
        values: &[String],
        record: &mut Record,
    ) -> Option<(usize, String)> {
        for (idx, (field, raw)) in fields.iter().zip(values).enumerate() {
            if let Err(message) = self.assign_field(field, raw, record) {
                return Some((idx, message));
            }
        }
        None
    }

    fn assign_field(&self, field: &FieldDescriptor, raw: &str, record: &mut Record) -> Result<(), String> {
        let value = if field.is_foreign_key() {
            // referential integrity is left to the persistence sink
            if raw.trim().is_empty() {
                if field.required {
                    return Err("Value required".into());
                }
                Value::Null
            } else {
                let id = reference::parse_identifier(raw).map_err(|e| e.to_string())?;
                Value::Int(id)
            }
        } else {
            let scalar = field
                .scalar_type
                .ok_or_else(|| format!("Field '{}' is not exportable", field.name))?;
            let value = coerce(raw, scalar, self.rules).map_err(|e| e.to_string())?;
            check_constraints(field, raw, &value, record).map_err(|e| e.message)?;
            value
        };

        record.set(&field.name, value).map_err(|e| e.to_string())
    }
}

/// Data column of each retained field, matched by name once per import
fn locate_columns(sheet: &DataSheet, fields: &[&FieldDescriptor]) -> Vec<Option<u32>> {
    let by_name = sheet.name_columns();
    fields
        .iter()
        .map(|field| {
            let col = by_name.get(&field.name).copied();
            if col.is_none() {
                log::warn!(
                    "Column '{}' not found in sheet '{}'; treating its cells as empty",
                    field.name,
                    sheet.name
                );
            }
            col
        })
        .collect()
}

/// Rows to write back into the annotated workbook
fn annotated_rows(processed: Vec<ProcessedRow>, options: ImportOptions) -> Vec<SheetRow> {
    if options.discard_valid {
        processed
            .into_iter()
            .filter(|p| p.error.is_some())
            .enumerate()
            .map(|(i, p)| SheetRow {
                row: FIRST_DATA_ROW + i as u32,
                values: p.values,
                error: p.error,
            })
            .collect()
    } else {
        processed
            .into_iter()
            .map(|p| SheetRow {
                row: p.row,
                values: p.values,
                error: p.error,
            })
            .collect()
    }
}
