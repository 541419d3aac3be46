//! Database access layer: values, rows, adapters, and statement execution.
//!
//! This module provides the pieces the query builder lowers into:
//! - Connection management (SQLite file or in-memory)
//! - An engine abstraction (`Database` / `Statement` / `Cursor`) with
//!   positional argument binding
//! - Result rows with live, detached, literal, and adapted storage
//!
//! # Row Lifetimes
//!
//! A row fetched through a `RowCursor` borrows the cursor: it is `Row<'c>`
//! and the borrow checker refuses a call to `next()` while it is alive.
//! `Row::copy()` returns a `DetachedRow` (`Row<'static>`) that owns its
//! values and can be kept indefinitely.
//!
//! # Error Taxonomy
//!
//! Positional and conversion failures are caller bugs; the trusting row
//! accessors panic with the `DbError` text, the `try_` accessors return it.
//! Schema mismatches surface when a mapping is resolved against a concrete
//! statement, never at construction time.

mod adapter;
mod backend;
mod config;
mod connection;
mod escape;
mod query;
mod row;
mod sqlite;
mod value;

pub use adapter::{AdapterBinding, ColumnsAdapter, RowAdapter};
pub use backend::{Cursor, Database, Statement, Step};
pub use config::DatabaseConfig;
pub use connection::{open_db, open_mem_db};
pub use escape::{escape_string, escape_string_for_quote, quote_identifier};
pub use query::{fetch, fetch_all, fetch_one, RowCursor, RowSequence};
pub use row::{DetachedRow, Row};
pub use sqlite::SqliteDatabase;
pub use value::{DatabaseValue, FromDatabaseValue};

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("row index out of range: {index} (row has {count} columns)")]
    Range { index: usize, count: usize },

    #[error("could not convert {value} to {target}")]
    Conversion { value: String, target: &'static str },

    #[error("could not convert NULL to {target}")]
    UnexpectedNull { target: &'static str },

    #[error("no such column: {name}")]
    MissingColumn { name: String },

    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("query selects no columns and has no source")]
    EmptySelection,

    #[error("Unsupported reversal: {message}")]
    UnsupportedReversal { message: String },

    #[error("Failed to open database '{path}': {message}")]
    OpenFailed { path: String, message: String },

    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
}
