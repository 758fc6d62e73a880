//! Template generation: field descriptors -> two-sheet xlsx workbook
//!
//! The data sheet carries three metadata rows (hidden field names, type
//! labels, display labels) above the editable range. Pick-list fields get
//! their options written to the same column of the hidden options sheet and a
//! list validation pointing at that column.

use anyhow::{Context, Result};
use rust_xlsxwriter::{
    Color, DataValidation, Format, FormatBorder, Formula, Note, Workbook, Worksheet, utility,
};

use super::codec;
use super::layout::{
    FIRST_DATA_ROW, LABEL_ROW, NAME_ROW, OPTIONS_SHEET, TYPE_ROW, TemplateLayout,
    data_sheet_name,
};
use crate::error::{CodecError, SchemaError};
use crate::reference::{self, ReferenceSource};
use crate::schema::{
    EntitySchema, FieldDescriptor, SchemaRegistry, describe_fields, navigation_target,
};

/// A data-sheet column and, for pick-list fields, its option values
#[derive(Debug, Clone)]
pub struct TemplateColumn {
    pub field: FieldDescriptor,
    pub col: u16,
    pub options: Option<Vec<String>>,
}

/// A row of submitted cell text to write back into the data sheet
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    /// Target row, 0-based
    pub row: u32,
    /// Cell text per template column
    pub values: Vec<String>,
    /// Invalid cell: template column index and message
    pub error: Option<(usize, String)>,
}

/// Resolved layout of a template for one entity
#[derive(Debug, Clone)]
pub struct Template {
    pub entity: String,
    pub columns: Vec<TemplateColumn>,
    pub layout: TemplateLayout,
}

/// Builds templates from registered schemas and current reference data
pub struct TemplateGenerator<'a> {
    registry: &'a SchemaRegistry,
    references: &'a dyn ReferenceSource,
    layout: TemplateLayout,
}

impl<'a> TemplateGenerator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        references: &'a dyn ReferenceSource,
        layout: TemplateLayout,
    ) -> Self {
        TemplateGenerator {
            registry,
            references,
            layout,
        }
    }

    /// Generate an empty template for an entity
    pub fn export(&self, entity: &str) -> Result<Vec<u8>> {
        let schema = self.registry.get(entity)?;
        let template = self.plan(schema)?;
        let bytes = template
            .render(&[])
            .with_context(|| format!("Failed to render template for '{}'", schema.name))?;

        log::info!(
            "Exported '{}' template: {} column(s), {} bytes",
            schema.name,
            template.columns.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Assign columns and collect pick-list options for every exportable field
    pub fn plan(&self, schema: &EntitySchema) -> Result<Template> {
        let descriptors = describe_fields(schema);
        let mut columns = Vec::new();

        for field in descriptors.iter().filter(|d| d.is_exportable()) {
            let col = u16::try_from(columns.len()).context("Too many columns for a worksheet")?;

            let options = if field.is_foreign_key() {
                let target = navigation_target(schema, &descriptors, field)?;
                let referenced = self.registry.get(target)?;
                Some(reference::build_identifiers(self.references, referenced)?)
            } else {
                field.enumerated_values.clone()
            };

            columns.push(TemplateColumn {
                field: field.clone(),
                col,
                options,
            });
        }

        if columns.is_empty() {
            return Err(SchemaError::NoUsableFields {
                entity: schema.name.clone(),
            }
            .into());
        }

        Ok(Template {
            entity: schema.name.clone(),
            columns,
            layout: self.layout,
        })
    }
}

impl Template {
    /// Write the workbook, with optional data rows, to xlsx bytes
    pub fn render(&self, rows: &[SheetRow]) -> Result<Vec<u8>, CodecError> {
        let mut workbook = Workbook::new();

        let header_format = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xD9E1F2))
            .set_border(FormatBorder::Thin);
        let text_format = Format::new().set_num_format("@");
        let error_format = Format::new()
            .set_num_format("@")
            .set_background_color(Color::RGB(0xFF0000));

        let sheet = workbook.add_worksheet();
        sheet.set_name(data_sheet_name(&self.entity))?;

        for column in &self.columns {
            self.write_header(sheet, column, &header_format, &text_format)?;
        }
        sheet.set_row_hidden(NAME_ROW)?;
        sheet.set_freeze_panes(FIRST_DATA_ROW, 0)?;

        for row in rows {
            write_row(sheet, row, &text_format, &error_format)?;
        }
        sheet.autofit();

        let options = workbook.add_worksheet();
        options.set_name(OPTIONS_SHEET)?;
        for column in &self.columns {
            if let Some(ref values) = column.options {
                for (i, value) in values.iter().enumerate() {
                    options.write_string(i as u32, column.col, value)?;
                }
            }
        }
        options.set_hidden(true);

        codec::encode(&mut workbook)
    }

    fn write_header(
        &self,
        sheet: &mut Worksheet,
        column: &TemplateColumn,
        header_format: &Format,
        text_format: &Format,
    ) -> Result<(), CodecError> {
        let col = column.col;
        let field = &column.field;

        sheet.write_string_with_format(NAME_ROW, col, &field.name, header_format)?;
        sheet.write_string_with_format(TYPE_ROW, col, field.type_label(), header_format)?;
        sheet.write_string_with_format(LABEL_ROW, col, field.header_label(), header_format)?;
        sheet.set_column_format(col, text_format)?;

        if let Some(ref values) = column.options {
            // an empty list still anchors a one-cell range
            let last = values.len().max(1) as u32 - 1;
            let source = format!(
                "={}!{}",
                OPTIONS_SHEET,
                utility::cell_range_absolute(0, col, last, col)
            );
            let validation = DataValidation::new().allow_list_formula(Formula::new(source));
            sheet.add_data_validation(
                FIRST_DATA_ROW,
                col,
                self.layout.last_data_row(),
                col,
                &validation,
            )?;
        }
        Ok(())
    }
}

fn write_row(
    sheet: &mut Worksheet,
    row: &SheetRow,
    text_format: &Format,
    error_format: &Format,
) -> Result<(), CodecError> {
    let error_col = row.error.as_ref().map(|(idx, _)| *idx);

    for (idx, text) in row.values.iter().enumerate() {
        let col = idx as u16;
        let format = if error_col == Some(idx) {
            error_format
        } else {
            text_format
        };
        if text.is_empty() {
            if error_col == Some(idx) {
                sheet.write_blank(row.row, col, format)?;
            }
        } else {
            sheet.write_string_with_format(row.row, col, text, format)?;
        }
    }

    if let Some((idx, ref message)) = row.error {
        sheet.insert_note(row.row, idx as u16, &Note::new(message))?;
    }
    Ok(())
}
