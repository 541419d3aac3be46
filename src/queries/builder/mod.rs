//! Query building infrastructure.
//!
//! This module provides the request types that lower to SQL text plus
//! positional arguments, and the trait the fetch layer consumes them through.
//!
//! # Architecture
//!
//! The query building system has three layers:
//!
//! 1. **Query Definition** - `SelectQuery`, `Association`, `Expression` and
//!    `Source` describe a request as plain values
//! 2. **Lowering** - `QueryBuilder::compile` renders SQL against a database,
//!    which supplies identifier quoting and schema metadata
//! 3. **Execution** - `CompiledQuery` + the row adapter from
//!    `QueryBuilder::adapter` are handed to `crate::db::fetch`
//!
//! # Example
//!
//! ```ignore
//! let query = SelectQuery::table("parents")
//!     .include(Association::has_one("child", "children", [("id", "parentID")]));
//!
//! let compiled = CompiledQuery::from_builder(&query, &db)?;
//! let rows = fetch_all(&db, &query)?;
//! ```

pub mod association;
pub mod expression;
pub mod helpers;
pub mod params;
pub mod select;
pub mod source;

use std::fmt;

use crate::db::{Database, DatabaseValue, DbError, RowAdapter};

pub use association::{Association, AssociationKind};
pub use expression::{Expression, Qualifier, Selectable, SortDescriptor};
pub use params::Bindings;
pub use select::{Limit, SelectQuery};
pub use source::{Join, LoweringContext, Source, SourceId, SourceTree};

/// A request that lowers to SQL and may reshape its rows.
pub trait QueryBuilder {
    /// Render SQL text, appending one argument per `?` to `bindings`.
    fn compile(&self, db: &dyn Database, bindings: &mut Bindings) -> Result<String, DbError>;

    /// The adapter applied to every fetched row.
    fn adapter(&self, _db: &dyn Database) -> Result<Option<RowAdapter>, DbError> {
        Ok(None)
    }
}

/// A compiled query ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub arguments: Vec<DatabaseValue>,
}

impl CompiledQuery {
    /// Create a compiled query from a builder and database.
    pub fn from_builder(builder: &dyn QueryBuilder, db: &dyn Database) -> Result<Self, DbError> {
        let mut bindings = Bindings::new();
        let sql = builder.compile(db, &mut bindings)?;
        Ok(CompiledQuery {
            sql,
            arguments: bindings.build(),
        })
    }

    /// Get the number of arguments in this query.
    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "{}", self.sql)
        } else {
            write!(f, "{} {}", self.sql, helpers::format_arguments_debug(&self.arguments))
        }
    }
}

/// Raw SQL with positional arguments and an optional row adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRequest {
    sql: String,
    arguments: Vec<DatabaseValue>,
    adapter: Option<RowAdapter>,
}

impl SqlRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            arguments: Vec::new(),
            adapter: None,
        }
    }

    pub fn arguments<I, V>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_adapter(mut self, adapter: RowAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }
}

impl QueryBuilder for SqlRequest {
    fn compile(&self, _db: &dyn Database, bindings: &mut Bindings) -> Result<String, DbError> {
        for argument in &self.arguments {
            bindings.push(argument.clone());
        }
        Ok(self.sql.clone())
    }

    fn adapter(&self, _db: &dyn Database) -> Result<Option<RowAdapter>, DbError> {
        Ok(self.adapter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_mem_db;

    #[test]
    fn test_compiled_query_from_builder() {
        let db = open_mem_db().unwrap();
        let request = SqlRequest::new("SELECT ?, ?").arguments([1i64, 2]);

        let compiled = CompiledQuery::from_builder(&request, &db).unwrap();
        assert_eq!(compiled.sql, "SELECT ?, ?");
        assert_eq!(compiled.argument_count(), 2);
    }

    #[test]
    fn test_compiled_query_display() {
        let compiled = CompiledQuery {
            sql: "SELECT ?".to_string(),
            arguments: vec![DatabaseValue::from("a")],
        };
        assert_eq!(compiled.to_string(), "SELECT ? [\"a\"]");

        let bare = CompiledQuery {
            sql: "SELECT 1".to_string(),
            arguments: vec![],
        };
        assert_eq!(bare.to_string(), "SELECT 1");
    }

    #[test]
    fn test_sql_request_adapter() {
        let db = open_mem_db().unwrap();
        let request = SqlRequest::new("SELECT 1");
        assert!(request.adapter(&db).unwrap().is_none());

        let adapted = request.with_adapter(RowAdapter::suffix(0));
        assert_eq!(adapted.adapter(&db).unwrap(), Some(RowAdapter::Suffix(0)));
    }

    #[test]
    fn test_compiled_query_clone() {
        let compiled = CompiledQuery {
            sql: "SELECT ?".to_string(),
            arguments: vec![DatabaseValue::Integer(42)],
        };

        let cloned = compiled.clone();
        assert_eq!(cloned, compiled);
    }
}
