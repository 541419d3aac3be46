//! SQLite engine backed by rusqlite.

use std::path::Path;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, ToSql};
use tracing::debug;

use super::backend::{Cursor, Database, Statement, Step};
use super::escape::quote_identifier;
use super::value::DatabaseValue;
use super::DbError;

/// A single SQLite connection.
pub struct SqliteDatabase {
    conn: Connection,
    name: &'static str,
}

impl SqliteDatabase {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).map_err(|e| DbError::OpenFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn,
            name: "Sqlite",
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::OpenFailed {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            conn,
            name: "SqliteMemory",
        })
    }

    /// Access the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Database for SqliteDatabase {
    fn backend_name(&self) -> &'static str {
        self.name
    }

    fn prepare<'db>(&'db self, sql: &str) -> Result<Box<dyn Statement + 'db>, DbError> {
        let stmt = self.conn.prepare(sql)?;
        let column_names = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Box::new(SqliteStatement {
            stmt,
            sql: sql.to_string(),
            column_names,
        }))
    }

    fn execute(&self, sql: &str, arguments: &[DatabaseValue]) -> Result<usize, DbError> {
        Ok(self.conn.execute(sql, params_from_iter(arguments.iter()))?)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        Ok(self.conn.execute_batch(sql)?)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        // table_xinfo lists generated columns too; hidden = 1 marks hidden
        // virtual-table columns, which `*` does not expand to.
        let sql = format!("PRAGMA table_xinfo({})", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(6)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(DbError::SchemaMismatch {
                message: format!("no such table: {}", table),
            });
        }
        Ok(columns
            .into_iter()
            .filter(|(_, hidden)| *hidden != 1)
            .map(|(name, _)| name)
            .collect())
    }

    fn table_has_rowid(&self, table: &str) -> Result<bool, DbError> {
        let entry: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT type, sql FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
                [table],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match entry {
            None => Err(DbError::SchemaMismatch {
                message: format!("no such table: {}", table),
            }),
            Some((kind, _)) if kind == "view" => Ok(false),
            Some((_, definition)) => Ok(!definition
                .unwrap_or_default()
                .to_ascii_uppercase()
                .contains("WITHOUT ROWID")),
        }
    }
}

struct SqliteStatement<'db> {
    stmt: rusqlite::Statement<'db>,
    sql: String,
    column_names: Vec<String>,
}

impl Statement for SqliteStatement<'_> {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn cursor<'s>(
        &'s mut self,
        arguments: &[DatabaseValue],
    ) -> Result<Box<dyn Cursor + 's>, DbError> {
        let width = self.column_names.len();
        let rows = self.stmt.query(params_from_iter(arguments.iter()))?;
        Ok(Box::new(SqliteCursor {
            rows,
            width,
            values: Vec::with_capacity(width),
        }))
    }
}

/// Refills one value buffer per step.
struct SqliteCursor<'s> {
    rows: rusqlite::Rows<'s>,
    width: usize,
    values: Vec<DatabaseValue>,
}

impl Cursor for SqliteCursor<'_> {
    fn step(&mut self) -> Result<Step, DbError> {
        self.values.clear();
        match self.rows.next()? {
            Some(row) => {
                for index in 0..self.width {
                    self.values.push(DatabaseValue::from(row.get_ref(index)?));
                }
                Ok(Step::RowAvailable)
            }
            None => Ok(Step::Done),
        }
    }

    fn values(&self) -> &[DatabaseValue] {
        &self.values
    }
}

impl From<ValueRef<'_>> for DatabaseValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => DatabaseValue::Null,
            ValueRef::Integer(i) => DatabaseValue::Integer(i),
            ValueRef::Real(f) => DatabaseValue::Real(f),
            ValueRef::Text(text) => DatabaseValue::Text(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(bytes) => DatabaseValue::Blob(bytes.to_vec()),
        }
    }
}

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            DatabaseValue::Null => ValueRef::Null,
            DatabaseValue::Integer(i) => ValueRef::Integer(*i),
            DatabaseValue::Real(f) => ValueRef::Real(*f),
            DatabaseValue::Text(s) => ValueRef::Text(s.as_bytes()),
            DatabaseValue::Blob(bytes) => ValueRef::Blob(bytes),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}
