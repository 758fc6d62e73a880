//! `formsheet schema` handler

use anyhow::Result;
use colored::*;

use super::App;
use crate::schema::{FieldKind, describe_fields};

pub fn handle_schema_command(app: &App, entity: Option<String>) -> Result<()> {
    let Some(entity) = entity else {
        if app.registry.is_empty() {
            println!("{}", "No entities registered".yellow());
            return Ok(());
        }
        for schema in app.registry.entities() {
            println!(
                "{} {}",
                schema.name.bold(),
                format!("({} fields)", schema.fields.len()).dimmed()
            );
        }
        return Ok(());
    };

    let schema = app.registry.get(&entity)?;
    println!("{} {}", schema.name.bold(), format!("[{}]", schema.table_name()).dimmed());

    for field in describe_fields(schema) {
        let kind = match field.kind {
            FieldKind::PrimaryKey => "key".magenta(),
            FieldKind::ForeignKey => "reference".cyan(),
            FieldKind::Scalar => "scalar".normal(),
        };
        let header = if field.is_exportable() {
            field.header_label().normal()
        } else {
            "not exported".dimmed()
        };
        println!(
            "  {:<24} {:<10} {:<10} {}",
            field.name,
            kind,
            field.type_label(),
            header
        );
        for constraint in &field.constraints {
            println!("      {}", serde_json::to_string(constraint)?.dimmed());
        }
    }
    Ok(())
}
