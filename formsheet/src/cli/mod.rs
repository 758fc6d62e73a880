//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Generate Excel data-entry templates from entity schemas and import them back
#[derive(Parser, Debug)]
#[command(name = "formsheet", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Schema file, overriding the configured one
    #[arg(short, long, global = true)]
    pub schema: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered entities, or describe the fields of one
    #[command(name = "schema")]
    Describe {
        /// Entity to describe
        entity: Option<String>,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Write the fillable template of an entity
    Export(ExportArgs),

    /// Validate a filled template and store its records
    Import(ImportArgs),
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create a table for every registered entity
    Init,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Entity name (case-insensitive)
    pub entity: String,

    /// Output file (defaults to <output_dir>/<Entity>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Filled template (.xlsx)
    pub file: PathBuf,

    /// Entity the template was generated for
    #[arg(short, long)]
    pub entity: String,

    /// Keep only the failing rows in the annotated workbook
    #[arg(long)]
    pub discard_valid: bool,

    /// Where to write the annotated workbook on failure
    /// (defaults to <output_dir>/<file stem>_errors.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the import report as JSON
    #[arg(long)]
    pub json: bool,
}
