//! Helper utilities for query building.
//!
//! Common functions used across the lowering code to reduce boilerplate
//! and ensure consistent formatting.

use crate::db::{DatabaseValue, DbError};

/// Lower each item and join the results with a separator.
///
/// Used for selection lists, argument lists, GROUP BY and ORDER BY clauses.
pub fn join_lowered<T, F>(items: &[T], separator: &str, mut lower: F) -> Result<String, DbError>
where
    F: FnMut(&T) -> Result<String, DbError>,
{
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(lower(item)?);
    }
    Ok(parts.join(separator))
}

/// Attach a collation to rendered SQL.
///
/// A parenthesised expression gets the collation inside its closing
/// parenthesis, so `(a = ?)` becomes `(a = ? COLLATE NOCASE)`.
pub fn insert_collation(sql: &str, collation: &str) -> String {
    match sql.strip_suffix(')') {
        Some(inner) => format!("{} COLLATE {})", inner, collation),
        None => format!("{} COLLATE {}", sql, collation),
    }
}

/// Format positional arguments as debug output.
///
/// Useful for logging query arguments during development.
pub fn format_arguments_debug(arguments: &[DatabaseValue]) -> String {
    let items: Vec<String> = arguments.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}
