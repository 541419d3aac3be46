//! Engine abstraction consumed by the row and query layers.
//!
//! The query builder only needs to prepare statements, step through their
//! results, and ask the schema how wide a table is. Everything else about
//! the engine (transactions, pooling, file format) stays behind this seam.

use super::escape::quote_identifier;
use super::value::DatabaseValue;
use super::DbError;

/// Outcome of advancing a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RowAvailable,
    Done,
}

/// Iteration state of one execution of a prepared statement.
///
/// Values returned by `values()` describe the current step only and are
/// overwritten by the next call to `step()`.
pub trait Cursor {
    /// Advance to the next result row.
    fn step(&mut self) -> Result<Step, DbError>;

    /// Values of the current step, in column order.
    fn values(&self) -> &[DatabaseValue];

    fn column_count(&self) -> usize {
        self.values().len()
    }

    /// Value of the current step at `index`. Panics when out of range.
    fn column_value(&self, index: usize) -> &DatabaseValue {
        &self.values()[index]
    }
}

/// A prepared statement.
pub trait Statement {
    /// The SQL text the statement was prepared from.
    fn sql(&self) -> &str;

    /// Result column names, in order.
    fn column_names(&self) -> &[String];

    fn column_count(&self) -> usize {
        self.column_names().len()
    }

    fn column_name(&self, index: usize) -> &str {
        &self.column_names()[index]
    }

    /// Index of the leftmost column matching `name`, case-insensitively.
    fn index_of_column(&self, name: &str) -> Option<usize> {
        self.column_names()
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Run the statement with positional arguments, resetting any previous
    /// execution.
    fn cursor<'s>(
        &'s mut self,
        arguments: &[DatabaseValue],
    ) -> Result<Box<dyn Cursor + 's>, DbError>;
}

/// Core trait for database connections.
pub trait Database {
    /// Get the backend name for logging/debugging.
    fn backend_name(&self) -> &'static str;

    /// Prepare a statement with `?` placeholders.
    fn prepare<'db>(&'db self, sql: &str) -> Result<Box<dyn Statement + 'db>, DbError>;

    /// Execute a statement that returns no rows. Returns the number of
    /// changed rows.
    fn execute(&self, sql: &str, arguments: &[DatabaseValue]) -> Result<usize, DbError>;

    /// Execute several `;`-separated statements without arguments.
    fn execute_batch(&self, sql: &str) -> Result<(), DbError>;

    /// Column names of a table, in declaration order.
    ///
    /// Returns `DbError::SchemaMismatch` when the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>, DbError>;

    /// Number of columns of a table, used to size `table.*` selections.
    fn number_of_columns(&self, table: &str) -> Result<usize, DbError> {
        Ok(self.table_columns(table)?.len())
    }

    /// Whether rows of a table carry the implicit integer row identity.
    fn table_has_rowid(&self, table: &str) -> Result<bool, DbError>;

    /// Quote an identifier with the engine's convention.
    fn quote_identifier(&self, identifier: &str) -> String {
        quote_identifier(identifier)
    }
}
