//! Result rows.
//!
//! A `Row<'a>` is an ordered list of `(column name, DatabaseValue)` pairs,
//! possibly exposing named variant sub-rows. Four storages back it:
//!
//! - **live**: borrows the value buffer of a cursor's current step; `'a` is
//!   the cursor borrow, so the row cannot outlive the next step
//! - **detached**: owns a copy of the values (`Row<'static>`)
//! - **literal**: owns `(name, value)` pairs built in memory
//! - **adapted**: a base row plus a resolved `AdapterBinding`
//!
//! Name lookups are case-insensitive and the leftmost column wins.
//!
//! ```ignore
//! let mut rows = fetch(&db, &SelectQuery::table("persons"))?;
//! let mut cursor = rows.iter()?;
//! while let Some(row) = cursor.next()? {
//!     let name: String = row.get_named("name");
//!     kept.push(row.copy());
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::adapter::{AdapterBinding, RowAdapter};
use super::value::{DatabaseValue, FromDatabaseValue};
use super::DbError;

/// A row that owns its values and outlives any statement.
pub type DetachedRow = Row<'static>;

/// Column names of a prepared statement, shared by all rows it yields.
#[derive(Debug)]
pub(crate) struct StatementColumns {
    names: Vec<String>,
    lowercase_indexes: HashMap<String, usize>,
}

impl StatementColumns {
    pub(crate) fn new(names: Vec<String>) -> Self {
        let mut lowercase_indexes = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            lowercase_indexes
                .entry(name.to_ascii_lowercase())
                .or_insert(index);
        }
        Self {
            names,
            lowercase_indexes,
        }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.lowercase_indexes
            .get(&name.to_ascii_lowercase())
            .copied()
    }
}

#[derive(Debug, Clone)]
enum Storage<'a> {
    Live {
        values: &'a [DatabaseValue],
        columns: Arc<StatementColumns>,
    },
    Detached {
        values: Vec<DatabaseValue>,
        columns: Arc<StatementColumns>,
    },
    Literal {
        pairs: Vec<(String, DatabaseValue)>,
    },
    Adapted {
        base: Arc<Row<'a>>,
        binding: Arc<AdapterBinding>,
    },
}

/// An ordered, case-insensitively addressable view over one result record.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    storage: Storage<'a>,
}

impl Default for Row<'static> {
    fn default() -> Self {
        Row::new()
    }
}

impl Row<'static> {
    /// An empty literal row.
    pub fn new() -> Self {
        Row {
            storage: Storage::Literal { pairs: Vec::new() },
        }
    }

    /// A literal row from `(column, value)` pairs, in order.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<DatabaseValue>,
    {
        Row {
            storage: Storage::Literal {
                pairs: pairs
                    .into_iter()
                    .map(|(name, value)| (name.into(), value.into()))
                    .collect(),
            },
        }
    }
}

impl<'a> Row<'a> {
    pub(crate) fn live(values: &'a [DatabaseValue], columns: Arc<StatementColumns>) -> Self {
        Row {
            storage: Storage::Live { values, columns },
        }
    }

    pub(crate) fn with_binding(self, binding: Arc<AdapterBinding>) -> Self {
        Row {
            storage: Storage::Adapted {
                base: Arc::new(self),
                binding,
            },
        }
    }

    /// Reshape this row through an adapter.
    ///
    /// Fails with `DbError::SchemaMismatch` when the adapter references
    /// columns this row does not have.
    pub fn adapted(self, adapter: &RowAdapter) -> Result<Self, DbError> {
        let binding = adapter.binding(&self.column_names())?;
        Ok(self.with_binding(Arc::new(binding)))
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Live { columns, .. } | Storage::Detached { columns, .. } => {
                columns.names.len()
            }
            Storage::Literal { pairs } => pairs.len(),
            Storage::Adapted { binding, .. } => binding.columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column name at `index`. Panics when out of range.
    pub fn column_name(&self, index: usize) -> &str {
        self.check_index(index);
        match &self.storage {
            Storage::Live { columns, .. } | Storage::Detached { columns, .. } => {
                &columns.names[index]
            }
            Storage::Literal { pairs } => &pairs[index].0,
            Storage::Adapted { binding, .. } => binding.columns.column_name(index),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        (0..self.len()).map(|i| self.column_name(i)).collect()
    }

    pub fn database_values(&self) -> impl Iterator<Item = &DatabaseValue> + '_ {
        (0..self.len()).map(|i| self.database_value(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> + '_ {
        (0..self.len()).map(|i| (self.column_name(i), self.database_value(i)))
    }

    /// Index of the leftmost column matching `name`, case-insensitively.
    pub fn index_of_column(&self, name: &str) -> Option<usize> {
        match &self.storage {
            Storage::Live { columns, .. } | Storage::Detached { columns, .. } => {
                columns.index_of(name)
            }
            Storage::Literal { pairs } => pairs
                .iter()
                .position(|(column, _)| column.eq_ignore_ascii_case(name)),
            Storage::Adapted { binding, .. } => binding.columns.index_of_column(name),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of_column(name).is_some()
    }

    /// Value at `index`. Panics with a range error when out of bounds.
    pub fn database_value(&self, index: usize) -> &DatabaseValue {
        match self.try_database_value(index) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_database_value(&self, index: usize) -> Result<&DatabaseValue, DbError> {
        if index >= self.len() {
            return Err(DbError::Range {
                index,
                count: self.len(),
            });
        }
        Ok(match &self.storage {
            Storage::Live { values, .. } => &values[index],
            Storage::Detached { values, .. } => &values[index],
            Storage::Literal { pairs } => &pairs[index].1,
            Storage::Adapted { base, binding } => {
                base.database_value(binding.columns.base_index(index))
            }
        })
    }

    pub fn database_value_named(&self, name: &str) -> Option<&DatabaseValue> {
        self.index_of_column(name).map(|i| self.database_value(i))
    }

    /// Decode the value at `index`; `Ok(None)` when it is NULL.
    pub fn try_get<T: FromDatabaseValue>(&self, index: usize) -> Result<Option<T>, DbError> {
        decode(self.try_database_value(index)?)
    }

    /// Decode a non-NULL value at `index`.
    ///
    /// Panics when the index is out of range, the value is NULL, or the
    /// conversion fails. Use `try_get` for a fallible form.
    pub fn get<T: FromDatabaseValue>(&self, index: usize) -> T {
        match self.try_get(index) {
            Ok(Some(value)) => value,
            Ok(None) => panic!("{}", DbError::UnexpectedNull { target: T::TYPE_NAME }),
            Err(e) => panic!("{}", e),
        }
    }

    /// Decode the value at `index`, `None` when NULL.
    ///
    /// Panics when the index is out of range or the conversion fails.
    pub fn get_opt<T: FromDatabaseValue>(&self, index: usize) -> Option<T> {
        match self.try_get(index) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_get_named<T: FromDatabaseValue>(&self, name: &str) -> Result<Option<T>, DbError> {
        let index = self
            .index_of_column(name)
            .ok_or_else(|| DbError::MissingColumn {
                name: name.to_string(),
            })?;
        self.try_get(index)
    }

    /// Decode a non-NULL value by column name. Panics when the column is
    /// missing, NULL, or not convertible.
    pub fn get_named<T: FromDatabaseValue>(&self, name: &str) -> T {
        match self.try_get_named(name) {
            Ok(Some(value)) => value,
            Ok(None) => panic!("{}", DbError::UnexpectedNull { target: T::TYPE_NAME }),
            Err(e) => panic!("{}", e),
        }
    }

    /// `None` when the column is missing or NULL. Panics when the conversion
    /// fails.
    pub fn get_named_opt<T: FromDatabaseValue>(&self, name: &str) -> Option<T> {
        let index = self.index_of_column(name)?;
        self.get_opt(index)
    }

    /// Borrow blob bytes without copying, valid for the row's lifetime.
    pub fn blob_no_copy(&self, index: usize) -> Option<&[u8]> {
        self.database_value(index).as_blob()
    }

    /// The variant sub-row registered under `name`.
    ///
    /// The variant shares this row's storage.
    pub fn variant(&self, name: &str) -> Option<Row<'a>> {
        match &self.storage {
            Storage::Adapted { base, binding } => binding.variant(name).map(|variant| Row {
                storage: Storage::Adapted {
                    base: Arc::clone(base),
                    binding: Arc::clone(variant),
                },
            }),
            _ => None,
        }
    }

    pub fn variant_names(&self) -> Vec<&str> {
        match &self.storage {
            Storage::Adapted { binding, .. } => binding.variants.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// A row independent of any statement cursor, variants included.
    pub fn copy(&self) -> DetachedRow {
        let storage = match &self.storage {
            Storage::Live { values, columns } => Storage::Detached {
                values: values.to_vec(),
                columns: Arc::clone(columns),
            },
            Storage::Detached { values, columns } => Storage::Detached {
                values: values.clone(),
                columns: Arc::clone(columns),
            },
            Storage::Literal { pairs } => Storage::Literal {
                pairs: pairs.clone(),
            },
            Storage::Adapted { base, binding } => Storage::Adapted {
                base: Arc::new(base.copy()),
                binding: Arc::clone(binding),
            },
        };
        Row { storage }
    }

    /// Whether this row borrows a cursor's current step.
    pub fn is_live(&self) -> bool {
        match &self.storage {
            Storage::Live { .. } => true,
            Storage::Adapted { base, .. } => base.is_live(),
            _ => false,
        }
    }

    fn check_index(&self, index: usize) {
        if index >= self.len() {
            panic!(
                "{}",
                DbError::Range {
                    index,
                    count: self.len()
                }
            );
        }
    }
}

fn decode<T: FromDatabaseValue>(value: &DatabaseValue) -> Result<Option<T>, DbError> {
    if value.is_null() {
        return Ok(None);
    }
    T::from_database_value(value)
        .map(Some)
        .ok_or_else(|| DbError::Conversion {
            value: value.to_string(),
            target: T::TYPE_NAME,
        })
}

impl<'b> PartialEq<Row<'b>> for Row<'_> {
    fn eq(&self, other: &Row<'b>) -> bool {
        if std::ptr::addr_eq(self as *const Self, other as *const Row<'b>) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        if !self.iter().eq(other.iter()) {
            return false;
        }
        let names = self.variant_names();
        if names != other.variant_names() {
            return false;
        }
        names
            .into_iter()
            .all(|name| match (self.variant(name), other.variant(name)) {
                (Some(mine), Some(theirs)) => mine == theirs,
                _ => false,
            })
    }
}

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Row")?;
        for (name, value) in self.iter() {
            write!(f, " {}:{}", name, value)?;
        }
        write!(f, ">")
    }
}
