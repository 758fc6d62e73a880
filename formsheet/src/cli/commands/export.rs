//! `formsheet export` handler

use anyhow::Result;
use colored::*;

use super::{App, write_file};
use crate::cli::ExportArgs;

pub async fn handle_export_command(app: &App, args: ExportArgs) -> Result<()> {
    let pool = app.open_database().await?;
    let workbench = app.workbench(&pool).await?;
    pool.close().await;

    let download = workbench.export(&args.entity)?;
    let path = app.output_path(args.output, &download.filename);
    write_file(&path, &download.content)?;

    println!(
        "Template for {} written to {}",
        args.entity.bold(),
        path.display().to_string().cyan()
    );
    Ok(())
}
