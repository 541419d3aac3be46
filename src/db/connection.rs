//! Database connection management.

use std::path::Path;

use super::sqlite::SqliteDatabase;
use super::DbError;

/// Open a SQLite database file, creating it if needed.
pub fn open_db(path: &Path) -> Result<SqliteDatabase, DbError> {
    SqliteDatabase::open(path)
}

/// Create an in-memory database instance.
///
/// Used for tests to avoid disk I/O and temp file management.
pub fn open_mem_db() -> Result<SqliteDatabase, DbError> {
    SqliteDatabase::open_in_memory()
}
