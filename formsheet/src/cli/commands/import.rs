//! `formsheet import` handler

use anyhow::Result;
use colored::*;

use super::{App, write_file};
use crate::cli::ImportArgs;
use crate::config::repository::SqliteSink;
use crate::excel::{ImportOptions, ImportReport};
use crate::service::ImportResponse;
use crate::upload::Upload;

pub async fn handle_import_command(app: &App, args: ImportArgs) -> Result<()> {
    let upload = Upload::from_path(&args.file)?;
    let pool = app.open_database().await?;
    let workbench = app.workbench(&pool).await?;
    let mut sink = SqliteSink::new(pool.clone(), &app.registry);

    let options = ImportOptions {
        discard_valid: args.discard_valid,
    };
    let response = workbench
        .import_and_commit(Some(&upload), &args.entity, options, &mut sink)
        .await;
    drop(sink);
    pool.close().await;

    match response? {
        ImportResponse::Success { committed, report } => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} Imported {} {} record(s) from {}",
                    "✓".green(),
                    committed.to_string().bold(),
                    report.entity.bold(),
                    upload.filename.cyan()
                );
            }
            Ok(())
        }
        ImportResponse::Annotated { download, report } => {
            let stem = args
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| report.entity.clone());
            let path = app.output_path(args.output, &format!("{}_errors.xlsx", stem));
            write_file(&path, &download.content)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_errors(&report);
                println!(
                    "Annotated workbook written to {}",
                    path.display().to_string().cyan()
                );
            }
            anyhow::bail!(
                "{} of {} row(s) rejected; nothing was imported",
                report.rows_invalid(),
                report.rows_read
            )
        }
    }
}

fn print_errors(report: &ImportReport) {
    println!(
        "{} {} invalid row(s) in {} {}:",
        "✗".red(),
        report.rows_invalid(),
        report.entity.bold(),
        "import".dimmed()
    );
    for error in &report.errors {
        println!(
            "  {:>6} {:>4}  {:<20} {}",
            format!("row {}", error.row).dimmed(),
            error
                .column
                .map(|c| format!("c{}", c))
                .unwrap_or_else(|| "--".to_string())
                .dimmed(),
            error.field.yellow(),
            error.message.red()
        );
    }
}
