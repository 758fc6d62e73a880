//! `formsheet db` handlers

use anyhow::Result;
use colored::*;

use super::App;
use crate::cli::DbCommands;

pub async fn handle_db_command(app: &App, command: DbCommands) -> Result<()> {
    match command {
        DbCommands::Init => {
            let pool = app.open_database().await?;
            for schema in app.registry.entities() {
                println!(
                    "  {} {} -> {}",
                    "✓".green(),
                    schema.name.bold(),
                    schema.table_name().dimmed()
                );
            }
            println!(
                "Database ready: {}",
                app.config.database_url.bright_green()
            );
            pool.close().await;
            Ok(())
        }
    }
}
