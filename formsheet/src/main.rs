use anyhow::Result;
use clap::Parser;

use formsheet::cli::commands::{self, App};
use formsheet::cli::{Cli, Commands};
use formsheet::config::Config;
use formsheet::schema::SchemaRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(schema) = cli.schema {
        config.schema_path = schema;
    }
    log::debug!("Using schema file {}", config.schema_path.display());

    let registry = SchemaRegistry::load(&config.schema_path)?;
    let app = App::new(config, registry);

    match cli.command {
        Commands::Describe { entity } => commands::schema::handle_schema_command(&app, entity),
        Commands::Db { command } => commands::db::handle_db_command(&app, command).await,
        Commands::Export(args) => commands::export::handle_export_command(&app, args).await,
        Commands::Import(args) => commands::import::handle_import_command(&app, args).await,
    }
}
