//! Configuration file handling for database connections.
//!
//! This module provides loading and parsing of `.rowshape.json` configuration files.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use crate::db::DatabaseConfig;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".rowshape.json";

/// Top-level configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Database configuration
    pub database: DatabaseConfigFile,
}

/// Database configuration variants.
///
/// JSON format uses "type" field with lowercase variant names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfigFile {
    /// SQLite database file
    Sqlite { path: PathBuf },
    /// In-memory database, discarded on close
    #[serde(rename = "memory")]
    Mem,
}

impl ConfigFile {
    /// Load configuration from `.rowshape.json` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file doesn't exist
    /// - The file cannot be read
    /// - The JSON is invalid
    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = PathBuf::from(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(format!(
                "Configuration file not found: {name}\n\n\
                 Examples:\n\
                 \n\
                 SQLite:\n\
                 {{\n  \
                   \"database\": {{\n    \
                     \"type\": \"sqlite\",\n    \
                     \"path\": \"./rowshape.sqlite\"\n  \
                   }}\n\
                 }}\n\
                 \n\
                 In-memory:\n\
                 {{\n  \
                   \"database\": {{\n    \
                     \"type\": \"memory\"\n  \
                   }}\n\
                 }}\n",
                name = CONFIG_FILE_NAME
            )
            .into());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read {}: {}", CONFIG_FILE_NAME, e))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {}: {}", CONFIG_FILE_NAME, e))?;

        Ok(config)
    }
}

impl DatabaseConfigFile {
    /// Convert this configuration to a DatabaseConfig.
    pub fn to_database_config(&self) -> DatabaseConfig {
        match self {
            Self::Sqlite { path } => DatabaseConfig::Sqlite { path: path.clone() },
            Self::Mem => DatabaseConfig::Memory,
        }
    }
}
