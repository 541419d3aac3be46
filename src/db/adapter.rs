//! Row adapters: column remapping and named variant sub-rows.
//!
//! A `RowAdapter` is a schema-agnostic description ("expose columns 3..6",
//! "expose `bookTitle` as `title`"). Resolving it against the concrete
//! column list of a statement yields an `AdapterBinding`, computed once per
//! statement and shared by every row it produces.
//!
//! Every adapter in a tree, variants included, is resolved against the base
//! row's columns: a variant never indexes into its parent's exposed columns.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use super::DbError;

/// Describes how a base row is reshaped into the row a consumer sees.
#[derive(Debug, Clone, PartialEq)]
pub enum RowAdapter {
    /// Expose every base column unchanged.
    Identity,
    /// Expose base columns starting at an index.
    Suffix(usize),
    /// Expose an exact span of base columns.
    Range(Range<usize>),
    /// Expose base columns under new names: `(exposed, base)` pairs.
    Mapping(Vec<(String, String)>),
    /// A main adapter plus named variant adapters.
    Nested {
        main: Box<RowAdapter>,
        variants: Vec<(String, RowAdapter)>,
    },
}

impl RowAdapter {
    pub fn identity() -> Self {
        RowAdapter::Identity
    }

    pub fn suffix(start: usize) -> Self {
        RowAdapter::Suffix(start)
    }

    pub fn range(range: Range<usize>) -> Self {
        RowAdapter::Range(range)
    }

    /// Build a renaming adapter from `(exposed, base)` column name pairs.
    pub fn mapping<I, E, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, B)>,
        E: Into<String>,
        B: Into<String>,
    {
        RowAdapter::Mapping(
            pairs
                .into_iter()
                .map(|(exposed, base)| (exposed.into(), base.into()))
                .collect(),
        )
    }

    /// Attach named variants to a main adapter.
    pub fn with_variants<I, N>(main: RowAdapter, variants: I) -> Self
    where
        I: IntoIterator<Item = (N, RowAdapter)>,
        N: Into<String>,
    {
        RowAdapter::Nested {
            main: Box::new(main),
            variants: variants
                .into_iter()
                .map(|(name, adapter)| (name.into(), adapter))
                .collect(),
        }
    }

    /// Resolve this adapter against the column names of a concrete statement.
    ///
    /// Fails with `DbError::SchemaMismatch` when a mapped column is absent or
    /// a span exceeds the available columns.
    pub fn binding<S: AsRef<str>>(&self, columns: &[S]) -> Result<AdapterBinding, DbError> {
        let binding = self.resolve(columns)?;
        debug!(
            columns = binding.columns.len(),
            variants = binding.variants.len(),
            "resolved row adapter"
        );
        Ok(binding)
    }

    fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> Result<AdapterBinding, DbError> {
        match self {
            RowAdapter::Nested { main, variants } => {
                let mut binding = main.resolve(columns)?;
                for (name, adapter) in variants {
                    binding
                        .variants
                        .insert(name.clone(), Arc::new(adapter.resolve(columns)?));
                }
                Ok(binding)
            }
            other => Ok(AdapterBinding {
                columns: other.columns_adapter(columns)?,
                variants: BTreeMap::new(),
            }),
        }
    }

    fn columns_adapter<S: AsRef<str>>(&self, columns: &[S]) -> Result<ColumnsAdapter, DbError> {
        let named = |index: usize| (index, columns[index].as_ref().to_string());
        let pairs = match self {
            RowAdapter::Identity => (0..columns.len()).map(named).collect(),
            RowAdapter::Suffix(start) => {
                check_span(*start..columns.len(), columns.len())?;
                (*start..columns.len()).map(named).collect()
            }
            RowAdapter::Range(range) => {
                check_span(range.clone(), columns.len())?;
                range.clone().map(named).collect()
            }
            RowAdapter::Mapping(mapping) => {
                let mut pairs = Vec::with_capacity(mapping.len());
                for (exposed, base) in mapping {
                    let index = columns
                        .iter()
                        .position(|column| column.as_ref().eq_ignore_ascii_case(base))
                        .ok_or_else(|| DbError::SchemaMismatch {
                            message: format!(
                                "Mapping references missing column {}. Valid column names are: {}.",
                                base,
                                columns
                                    .iter()
                                    .map(|column| column.as_ref())
                                    .collect::<Vec<&str>>()
                                    .join(", ")
                            ),
                        })?;
                    pairs.push((index, exposed.clone()));
                }
                pairs.sort_by_key(|(index, _)| *index);
                pairs
            }
            RowAdapter::Nested { main, .. } => return main.columns_adapter(columns),
        };
        Ok(ColumnsAdapter::new(pairs))
    }
}

fn check_span(range: Range<usize>, count: usize) -> Result<(), DbError> {
    if range.start > range.end || range.end > count {
        return Err(DbError::SchemaMismatch {
            message: format!(
                "Column span {}..{} exceeds the {} available columns",
                range.start, range.end, count
            ),
        });
    }
    Ok(())
}

/// Exposed column layout over a base row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsAdapter {
    column_base_indexes: Vec<(usize, String)>,
    lowercase_indexes: HashMap<String, usize>,
}

impl ColumnsAdapter {
    /// Build from `(base_index, exposed_name)` pairs in exposed order.
    pub fn new(column_base_indexes: Vec<(usize, String)>) -> Self {
        let mut lowercase_indexes = HashMap::with_capacity(column_base_indexes.len());
        for (index, (_, name)) in column_base_indexes.iter().enumerate() {
            lowercase_indexes
                .entry(name.to_ascii_lowercase())
                .or_insert(index);
        }
        Self {
            column_base_indexes,
            lowercase_indexes,
        }
    }

    pub fn len(&self) -> usize {
        self.column_base_indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_base_indexes.is_empty()
    }

    /// Base row index of exposed column `index`.
    pub fn base_index(&self, index: usize) -> usize {
        self.column_base_indexes[index].0
    }

    pub fn column_name(&self, index: usize) -> &str {
        &self.column_base_indexes[index].1
    }

    /// Exposed index of the leftmost column named `name`, case-insensitively.
    pub fn index_of_column(&self, name: &str) -> Option<usize> {
        self.lowercase_indexes
            .get(&name.to_ascii_lowercase())
            .copied()
    }
}

/// A `RowAdapter` resolved against a concrete column list.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterBinding {
    pub columns: ColumnsAdapter,
    pub variants: BTreeMap<String, Arc<AdapterBinding>>,
}

impl AdapterBinding {
    pub fn variant(&self, name: &str) -> Option<&Arc<AdapterBinding>> {
        self.variants.get(name)
    }
}
