//! Positional argument collection for query lowering.
//!
//! Lowering appends one value per `?` placeholder, in the order the
//! placeholders appear in the SQL text.

use crate::db::DatabaseValue;

/// Collects positional arguments while SQL text is rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: Vec<DatabaseValue>,
}

impl Bindings {
    /// Create a new, empty collection.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Append an argument and return its placeholder.
    pub fn push<T: Into<DatabaseValue>>(&mut self, value: T) -> &'static str {
        self.values.push(value.into());
        "?"
    }

    /// Build the final argument list.
    pub fn build(self) -> Vec<DatabaseValue> {
        self.values
    }

    /// Get a reference to the arguments collected so far.
    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Into<DatabaseValue>> FromIterator<T> for Bindings {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}
