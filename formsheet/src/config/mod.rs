//! Application configuration
//!
//! Loaded from `--config <path>` or `<config dir>/formsheet/config.toml`,
//! then overridden by `FORMSHEET_*` environment variables (a `.env` file is
//! honoured). Missing files fall back to defaults.

pub mod repository;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::excel::TemplateLayout;
use crate::excel::layout::DEFAULT_ROW_LIMIT;
use crate::validation::CoercionRules;

const APP_DIR: &str = "formsheet";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `database_url`
pub const ENV_DATABASE_URL: &str = "FORMSHEET_DATABASE_URL";
/// Environment variable overriding `schema_path`
pub const ENV_SCHEMA: &str = "FORMSHEET_SCHEMA";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding reference data and imported records
    pub database_url: String,
    /// TOML file with the registered entity schemas
    pub schema_path: PathBuf,
    /// Last editable template row (1-based)
    pub row_limit: u32,
    /// chrono formats accepted for date cells, tried in order
    pub date_formats: Vec<String>,
    /// Markers read as `true` in boolean cells
    pub affirmative_markers: Vec<String>,
    /// Where exported and annotated workbooks are written
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let rules = CoercionRules::default();
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        Config {
            database_url: format!("sqlite://{}?mode=rwc", data_dir.join("formsheet.db").display()),
            schema_path: PathBuf::from("schemas.toml"),
            row_limit: DEFAULT_ROW_LIMIT,
            date_formats: rules.date_formats,
            affirmative_markers: rules.affirmative_markers,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    log::debug!("No config file found, using defaults");
                    Config::default()
                }
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&src)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("Failed to parse config")
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Ok(path) = std::env::var(ENV_SCHEMA) {
            self.schema_path = PathBuf::from(path);
        }
    }

    pub fn layout(&self) -> TemplateLayout {
        TemplateLayout::new(self.row_limit)
    }

    pub fn coercion_rules(&self) -> CoercionRules {
        CoercionRules {
            affirmative_markers: self
                .affirmative_markers
                .iter()
                .map(|m| m.trim().to_uppercase())
                .collect(),
            date_formats: self.date_formats.clone(),
        }
    }
}

/// `<config dir>/formsheet/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            database_url = "sqlite::memory:"
            row_limit = 50
            affirmative_markers = [" ja ", "y"]
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.layout().row_limit, 50);
        assert_eq!(config.date_formats, CoercionRules::default().date_formats);
        assert_eq!(
            config.coercion_rules().affirmative_markers,
            vec!["JA".to_string(), "Y".to_string()]
        );
    }

    #[test]
    fn test_rejects_unparsable_file() {
        assert!(Config::from_toml_str("row_limit = \"many\"").is_err());
    }
}
