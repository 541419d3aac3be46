//! Query execution utilities.
//!
//! `fetch` lowers a request, prepares it, and resolves its row adapter once
//! against the statement's columns. The returned `RowSequence` is
//! restartable: each call to `iter()` runs the statement again, so two
//! iterations may observe different data if the database changed in between.

use std::sync::Arc;

use tracing::{debug, trace};

use super::adapter::AdapterBinding;
use super::backend::{Cursor, Database, Statement, Step};
use super::row::{DetachedRow, Row, StatementColumns};
use super::value::DatabaseValue;
use super::DbError;
use crate::queries::builder::{CompiledQuery, QueryBuilder};

/// A prepared request whose rows can be iterated any number of times.
pub struct RowSequence<'db> {
    statement: Box<dyn Statement + 'db>,
    arguments: Vec<DatabaseValue>,
    columns: Arc<StatementColumns>,
    binding: Option<Arc<AdapterBinding>>,
}

impl<'db> RowSequence<'db> {
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    /// Column names of the underlying statement, before adaptation.
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Run the statement from the start.
    pub fn iter(&mut self) -> Result<RowCursor<'_>, DbError> {
        let cursor = self.statement.cursor(&self.arguments)?;
        Ok(RowCursor {
            cursor,
            columns: Arc::clone(&self.columns),
            binding: self.binding.clone(),
            fetched: 0,
        })
    }
}

/// One pass over a `RowSequence`.
///
/// Rows returned by `next()` borrow the cursor and are valid until the next
/// call; use `Row::copy()` to keep one.
pub struct RowCursor<'s> {
    cursor: Box<dyn Cursor + 's>,
    columns: Arc<StatementColumns>,
    binding: Option<Arc<AdapterBinding>>,
    fetched: usize,
}

impl RowCursor<'_> {
    pub fn next(&mut self) -> Result<Option<Row<'_>>, DbError> {
        match self.cursor.step()? {
            Step::Done => {
                trace!(rows = self.fetched, "cursor exhausted");
                Ok(None)
            }
            Step::RowAvailable => {
                self.fetched += 1;
                let row = Row::live(self.cursor.values(), Arc::clone(&self.columns));
                Ok(Some(match &self.binding {
                    Some(binding) => row.with_binding(Arc::clone(binding)),
                    None => row,
                }))
            }
        }
    }
}

/// Prepare a request and resolve its adapter.
pub fn fetch<'db>(
    db: &'db dyn Database,
    request: &dyn QueryBuilder,
) -> Result<RowSequence<'db>, DbError> {
    let compiled = CompiledQuery::from_builder(request, db)?;
    debug!(
        backend = db.backend_name(),
        sql = %compiled.sql,
        arguments = compiled.argument_count(),
        "preparing statement"
    );
    let statement = db.prepare(&compiled.sql)?;
    let columns = Arc::new(StatementColumns::new(statement.column_names().to_vec()));
    let binding = match request.adapter(db)? {
        Some(adapter) => Some(Arc::new(adapter.binding(columns.names())?)),
        None => None,
    };
    Ok(RowSequence {
        statement,
        arguments: compiled.arguments,
        columns,
        binding,
    })
}

/// Fetch every row as a detached copy.
pub fn fetch_all(db: &dyn Database, request: &dyn QueryBuilder) -> Result<Vec<DetachedRow>, DbError> {
    let mut sequence = fetch(db, request)?;
    let mut cursor = sequence.iter()?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.next()? {
        rows.push(row.copy());
    }
    Ok(rows)
}

/// Fetch the first row, if any, as a detached copy.
pub fn fetch_one(db: &dyn Database, request: &dyn QueryBuilder) -> Result<Option<DetachedRow>, DbError> {
    let mut sequence = fetch(db, request)?;
    let mut cursor = sequence.iter()?;
    let row = cursor.next()?.map(|row| row.copy());
    Ok(row)
}
