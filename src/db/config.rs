//! Database configuration for runtime backend selection.
//!
//! This module provides configuration parsing and backend instantiation:
//! a SQLite file or an in-memory database.

use std::error::Error;
use std::path::PathBuf;

use super::backend::Database;
use super::sqlite::SqliteDatabase;

/// Default database location when nothing else is configured.
pub const DEFAULT_DATABASE_PATH: &str = "./rowshape.sqlite";

/// Configuration for database backend selection.
///
/// Resolved from a configuration file, environment variables, or a URL.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    /// SQLite database file.
    Sqlite { path: PathBuf },

    /// In-memory SQLite database (for testing).
    Memory,
}

impl DatabaseConfig {
    /// Create a backend instance from this configuration.
    pub fn connect(&self) -> Result<Box<dyn Database>, Box<dyn Error>> {
        let backend = match self {
            Self::Sqlite { path } => Box::new(SqliteDatabase::open(path)?) as Box<dyn Database>,
            Self::Memory => Box::new(SqliteDatabase::open_in_memory()?) as Box<dyn Database>,
        };
        Ok(backend)
    }

    /// Parse from a connection URL or file path.
    ///
    /// Supported formats:
    /// - `./path/to/db.sqlite` or `/absolute/path` → Sqlite
    /// - `sqlite:///path/to/db` → Sqlite
    /// - `:memory:` → Memory
    ///
    /// Any other `scheme://` is rejected.
    pub fn from_url(url: &str) -> Result<Self, Box<dyn Error>> {
        if url == ":memory:" {
            return Ok(Self::Memory);
        }

        if let Some(path) = url.strip_prefix("sqlite://") {
            return Ok(Self::Sqlite {
                path: PathBuf::from(path),
            });
        }

        if let Some((scheme, _)) = url.split_once("://") {
            return Err(format!("Unsupported database URL scheme: {}", scheme).into());
        }

        // Default: treat as file path
        Ok(Self::Sqlite {
            path: PathBuf::from(url),
        })
    }

    /// Load from environment variables.
    ///
    /// Checks in order:
    /// 1. DATABASE_URL environment variable
    /// 2. ROWSHAPE_DB_PATH environment variable
    pub fn from_env() -> Result<Option<Self>, Box<dyn Error>> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return Ok(Some(Self::from_url(&url)?));
        }

        if let Ok(path) = std::env::var("ROWSHAPE_DB_PATH") {
            return Ok(Some(Self::Sqlite {
                path: PathBuf::from(path),
            }));
        }

        Ok(None)
    }

    /// Resolve configuration from config file and environment.
    ///
    /// Priority: Config file > Environment > Default (./rowshape.sqlite)
    pub fn resolve() -> Result<Self, Box<dyn Error>> {
        if let Ok(config_file) = crate::config::ConfigFile::load() {
            return Ok(config_file.database.to_database_config());
        }

        if let Some(config) = Self::from_env()? {
            return Ok(config);
        }

        Self::from_url(DEFAULT_DATABASE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            std::env::remove_var("DATABASE_URL");
            std::env::remove_var("ROWSHAPE_DB_PATH");
        }
    }

    #[rstest]
    #[case("./test.sqlite", "./test.sqlite")]
    #[case("/tmp/test.sqlite", "/tmp/test.sqlite")]
    #[case("sqlite:///tmp/test.db", "/tmp/test.db")]
    fn test_from_url_sqlite(#[case] url: &str, #[case] expected: &str) {
        let config = DatabaseConfig::from_url(url).unwrap();
        assert_eq!(
            config,
            DatabaseConfig::Sqlite {
                path: PathBuf::from(expected)
            }
        );
    }

    #[test]
    fn test_from_url_memory() {
        let config = DatabaseConfig::from_url(":memory:").unwrap();
        assert_eq!(config, DatabaseConfig::Memory);
    }

    #[rstest]
    #[case("postgres://localhost/test")]
    #[case("mysql://localhost/test")]
    fn test_from_url_other_schemes_rejected(#[case] url: &str) {
        let result = DatabaseConfig::from_url(url);
        assert!(result.unwrap_err().to_string().contains("Unsupported"));
    }

    #[test]
    fn test_connect_sqlite() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = DatabaseConfig::Sqlite {
            path: tmp.path().to_path_buf(),
        };
        let backend = config.connect().unwrap();
        assert_eq!(backend.backend_name(), "Sqlite");
    }

    #[test]
    fn test_connect_memory() {
        let backend = DatabaseConfig::Memory.connect().unwrap();
        assert_eq!(backend.backend_name(), "SqliteMemory");
    }

    #[test]
    #[serial]
    fn test_from_env_none() {
        clear_env();
        assert!(DatabaseConfig::from_env().unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_db_path() {
        clear_env();
        unsafe {
            std::env::set_var("ROWSHAPE_DB_PATH", "/tmp/test.sqlite");
        }
        let config = DatabaseConfig::from_env().unwrap().unwrap();
        clear_env();
        assert_eq!(
            config,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("/tmp/test.sqlite")
            }
        );
    }

    #[test]
    #[serial]
    fn test_from_env_database_url_takes_precedence() {
        unsafe {
            std::env::set_var("DATABASE_URL", "sqlite:///tmp/from_url.db");
            std::env::set_var("ROWSHAPE_DB_PATH", "/tmp/from_path.sqlite");
        }
        let config = DatabaseConfig::from_env().unwrap().unwrap();
        clear_env();
        assert_eq!(
            config,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("/tmp/from_url.db")
            }
        );
    }

    #[test]
    #[serial]
    fn test_resolve_env_fallback() {
        let temp_dir = tempfile::tempdir().unwrap();
        let old_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();
        unsafe {
            std::env::set_var("DATABASE_URL", ":memory:");
        }
        let config = DatabaseConfig::resolve().unwrap();
        clear_env();
        std::env::set_current_dir(old_dir).unwrap();
        assert_eq!(config, DatabaseConfig::Memory);
    }

    #[test]
    #[serial]
    fn test_resolve_default_fallback() {
        let temp_dir = tempfile::tempdir().unwrap();
        let old_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();
        clear_env();
        let config = DatabaseConfig::resolve().unwrap();
        std::env::set_current_dir(old_dir).unwrap();
        assert_eq!(
            config,
            DatabaseConfig::Sqlite {
                path: PathBuf::from(DEFAULT_DATABASE_PATH)
            }
        );
    }

    #[test]
    #[serial]
    fn test_resolve_prefers_config_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(crate::config::CONFIG_FILE_NAME),
            r#"{ "database": { "type": "memory" } }"#,
        )
        .unwrap();
        let old_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();
        unsafe {
            std::env::set_var("DATABASE_URL", "/tmp/ignored.sqlite");
        }
        let config = DatabaseConfig::resolve().unwrap();
        clear_env();
        std::env::set_current_dir(old_dir).unwrap();
        assert_eq!(config, DatabaseConfig::Memory);
    }
}
