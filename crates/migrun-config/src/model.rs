use std::path::PathBuf;

use migrun_common::validation::{MIN_IDENTIFIER_WIDTH, validate_identifier_width, validate_name};
use migrun_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default name of the bookkeeping table.
pub const DEFAULT_TABLE: &str = "migrations";

/// Default zero-padding width of migration identifiers.
pub const DEFAULT_IDENTIFIER_WIDTH: usize = MIN_IDENTIFIER_WIDTH;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file. `None` means the caller must supply one.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Bookkeeping table name. Distinct names give independent tracks in one database.
    pub table: String,
    /// Digits of zero padding in identifiers (`007_name` for width 3).
    pub identifier_width: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            identifier_width: DEFAULT_IDENTIFIER_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.migrations.validate()
    }
}

impl MigrationConfig {
    /// Same rules the runner applies when it opens the bookkeeping table and
    /// derives identifiers.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.table)
            .map_err(|e| Error::Config(format!("migrations.table: {e}")))?;
        validate_identifier_width(self.identifier_width)
            .map_err(|e| Error::Config(format!("migrations.identifier_width: {e}")))?;
        Ok(())
    }
}
