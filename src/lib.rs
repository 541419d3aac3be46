//! rowshape - relational rows and associations over SQLite
//!
//! Provides database rows with live, detached, literal, and adapted storage,
//! a query builder that lowers expressions and associations to SQL, and
//! row adapters that expose joined tables as named variants.

pub mod config;
pub mod db;
pub mod queries;

pub use db::{
    fetch, fetch_all, fetch_one, open_db, open_mem_db, ColumnsAdapter, Database, DatabaseConfig,
    DatabaseValue, DbError, DetachedRow, FromDatabaseValue, Row, RowAdapter, SqliteDatabase,
};
pub use queries::builder::expression::{
    column, count, count_all, count_distinct, exists, function, literal, value,
};
pub use queries::builder::{
    Association, AssociationKind, CompiledQuery, Expression, QueryBuilder, SelectQuery,
    SortDescriptor, SqlRequest,
};
