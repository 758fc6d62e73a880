//! Subcommand handlers

pub mod db;
pub mod export;
pub mod import;
pub mod schema;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::config::repository;
use crate::schema::SchemaRegistry;
use crate::service::Workbench;

/// Loaded configuration and schemas shared by every handler
pub struct App {
    pub config: Config,
    pub registry: SchemaRegistry,
}

impl App {
    pub fn new(config: Config, registry: SchemaRegistry) -> Self {
        App { config, registry }
    }

    /// Open the database with a table for every registered entity
    pub async fn open_database(&self) -> Result<SqlitePool> {
        let pool = repository::connect(&self.config.database_url).await?;
        repository::ensure_tables(&pool, &self.registry).await?;
        Ok(pool)
    }

    /// Workbench backed by the reference data currently in the database
    pub async fn workbench(&self, pool: &SqlitePool) -> Result<Workbench> {
        let references = repository::load_references(pool, &self.registry).await?;
        Ok(Workbench::new(self.registry.clone(), references)
            .with_layout(self.config.layout())
            .with_rules(self.config.coercion_rules()))
    }

    /// Resolve an output path, defaulting to a file in `output_dir`
    pub fn output_path(&self, explicit: Option<PathBuf>, filename: &str) -> PathBuf {
        explicit.unwrap_or_else(|| self.config.output_dir.join(filename))
    }
}

/// Write bytes to disk, creating the parent directory
pub fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}
