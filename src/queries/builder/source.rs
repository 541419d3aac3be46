//! FROM-clause sources and self-join aliasing.
//!
//! Sources live in an index-addressed arena owned by their `SelectQuery`.
//! Joins reference their operands by `SourceId`, so attaching an association
//! never mutates a shared source: it pushes new nodes and moves the root.
//!
//! Aliases are not stored state. `SourceTree::resolve_names` computes them
//! from the tree at lowering time: sources are visited in pre-order (a join
//! visits its base, then its origin, then its target), grouped by their
//! declared name case-insensitively, and every member of a group with more
//! than one source is renamed `name0`, `name1`, ... in visiting order.
//! A subquery is its own naming scope and is not descended into.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::db::{Database, DbError};

use super::association::AssociationKind;
use super::helpers::join_lowered;
use super::params::Bindings;
use super::select::SelectQuery;

static NEXT_TREE: AtomicU64 = AtomicU64::new(0);

/// Address of a source inside a `SourceTree`.
///
/// An id is scoped to the query that created it (and its clones). Lowering
/// an id inside another query, e.g. an outer source referenced from an
/// `exists` subquery, fails; qualify such columns by name instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId {
    tree: u64,
    index: usize,
}

/// A FROM-clause constituent.
#[derive(Debug, Clone)]
pub enum Source {
    Table {
        table: String,
        alias: Option<String>,
    },
    Query {
        query: Box<SelectQuery>,
        alias: Option<String>,
    },
    Join(Join),
}

impl Source {
    pub fn table(table: impl Into<String>) -> Self {
        Source::Table {
            table: table.into(),
            alias: None,
        }
    }

    pub fn query(query: SelectQuery, alias: Option<String>) -> Self {
        Source::Query {
            query: Box::new(query),
            alias,
        }
    }

    /// The name this source is addressed by before disambiguation.
    fn declared_name(&self) -> Option<&str> {
        match self {
            Source::Table { table, alias } => Some(alias.as_deref().unwrap_or(table)),
            Source::Query { alias, .. } => alias.as_deref(),
            Source::Join(_) => None,
        }
    }
}

/// A left join of `target` onto `base`, matching columns of `origin`.
///
/// `origin` is the source inside `base` whose columns appear on the left of
/// the foreign-key equalities. `selection_index` is the position of the
/// target's star in the selection list.
#[derive(Debug, Clone)]
pub struct Join {
    pub base: SourceId,
    pub origin: SourceId,
    pub target: SourceId,
    /// `(origin column, target column)` pairs.
    pub foreign_key: Vec<(String, String)>,
    pub kind: AssociationKind,
    pub variant_name: String,
    pub selection_index: usize,
}

/// Arena of sources with a designated root.
#[derive(Debug, Clone)]
pub struct SourceTree {
    tree: u64,
    nodes: Vec<Source>,
    root: Option<SourceId>,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self {
            tree: NEXT_TREE.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(source: Source) -> Self {
        let mut tree = Self::new();
        let root = tree.push(source);
        tree.root = Some(root);
        tree
    }

    pub fn push(&mut self, source: Source) -> SourceId {
        self.nodes.push(source);
        SourceId {
            tree: self.tree,
            index: self.nodes.len() - 1,
        }
    }

    /// Whether `id` was created by this tree or a clone of it.
    pub fn contains(&self, id: SourceId) -> bool {
        id.tree == self.tree && id.index < self.nodes.len()
    }

    pub fn root(&self) -> Option<SourceId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: SourceId) {
        self.root = Some(root);
    }

    pub fn get(&self, id: SourceId) -> &Source {
        &self.nodes[id.index]
    }

    pub(crate) fn get_mut(&mut self, id: SourceId) -> &mut Source {
        &mut self.nodes[id.index]
    }

    /// The leftmost non-join source under `id`.
    pub fn left_source_for_joins(&self, id: SourceId) -> SourceId {
        match self.get(id) {
            Source::Join(join) => self.left_source_for_joins(join.base),
            _ => id,
        }
    }

    /// Joins in attachment order.
    pub fn joins(&self) -> impl Iterator<Item = &Join> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Source::Join(join) => Some(join),
            _ => None,
        })
    }

    pub fn has_joins(&self) -> bool {
        self.joins().next().is_some()
    }

    /// Non-join sources reachable from the root, in pre-order, each once.
    pub fn referenced_sources(&self) -> Vec<SourceId> {
        let mut visited = Vec::new();
        if let Some(root) = self.root {
            self.visit(root, &mut visited);
        }
        visited
    }

    fn visit(&self, id: SourceId, visited: &mut Vec<SourceId>) {
        match self.get(id) {
            Source::Join(join) => {
                self.visit(join.base, visited);
                self.visit(join.origin, visited);
                self.visit(join.target, visited);
            }
            _ => {
                if !visited.contains(&id) {
                    visited.push(id);
                }
            }
        }
    }

    /// Disambiguated names, indexed by source.
    pub fn resolve_names(&self) -> Vec<Option<String>> {
        let mut names = vec![None; self.nodes.len()];
        let mut groups: HashMap<String, Vec<SourceId>> = HashMap::new();
        for id in self.referenced_sources() {
            if let Some(name) = self.get(id).declared_name() {
                groups.entry(name.to_ascii_lowercase()).or_default().push(id);
            }
        }
        for members in groups.values() {
            let renamed = members.len() > 1;
            for (position, id) in members.iter().enumerate() {
                let declared = self.get(*id).declared_name().unwrap_or_default();
                names[id.index] = Some(if renamed {
                    format!("{}{}", declared, position)
                } else {
                    declared.to_string()
                });
            }
        }
        names
    }

    /// Number of result columns a star of `id` expands to.
    pub fn column_count(&self, id: SourceId, db: &dyn Database) -> Result<usize, DbError> {
        match self.get(id) {
            Source::Table { table, .. } => db.number_of_columns(table),
            Source::Query { query, .. } => query.column_count(db),
            Source::Join(join) => {
                Ok(self.column_count(join.base, db)? + self.column_count(join.target, db)?)
            }
        }
    }
}

/// Per-query state shared by every node lowered within one SELECT.
pub struct LoweringContext<'a> {
    db: &'a dyn Database,
    sources: &'a SourceTree,
    names: Vec<Option<String>>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(db: &'a dyn Database, sources: &'a SourceTree) -> Self {
        Self {
            db,
            sources,
            names: sources.resolve_names(),
        }
    }

    pub fn db(&self) -> &'a dyn Database {
        self.db
    }

    pub fn sources(&self) -> &'a SourceTree {
        self.sources
    }

    pub fn quote(&self, identifier: &str) -> String {
        self.db.quote_identifier(identifier)
    }

    /// Resolved name of a source in this query.
    pub fn source_name(&self, id: SourceId) -> Result<&str, DbError> {
        if !self.sources.contains(id) {
            return Err(DbError::SchemaMismatch {
                message: "source belongs to another query; qualify the column by name".to_string(),
            });
        }
        self.names[id.index]
            .as_deref()
            .ok_or_else(|| DbError::SchemaMismatch {
                message: "joins and unaliased subqueries cannot be referenced by name".to_string(),
            })
    }

    /// Render a source for the FROM clause.
    pub fn source_sql(&self, id: SourceId, bindings: &mut Bindings) -> Result<String, DbError> {
        match self.sources.get(id) {
            Source::Table { table, .. } => {
                let name = self.source_name(id)?;
                if name == table {
                    Ok(self.quote(table))
                } else {
                    Ok(format!("{} {}", self.quote(table), self.quote(name)))
                }
            }
            Source::Query { query, .. } => {
                let sql = query.lower(self.db, bindings)?;
                match self.names[id.index].as_deref() {
                    Some(name) => Ok(format!("({}) AS {}", sql, self.quote(name))),
                    None => Ok(format!("({})", sql)),
                }
            }
            Source::Join(join) => {
                self.validate_foreign_key(join)?;
                let base = self.source_sql(join.base, bindings)?;
                let target = self.source_sql(join.target, bindings)?;
                let target_name = self.source_name(join.target)?;
                let origin_name = self.source_name(join.origin)?;
                let conditions = join_lowered(&join.foreign_key, " AND ", |(origin, column)| {
                    Ok(format!(
                        "{}.{} = {}.{}",
                        self.quote(target_name),
                        self.quote(column),
                        self.quote(origin_name),
                        self.quote(origin)
                    ))
                })?;
                Ok(format!("{} LEFT JOIN {} ON {}", base, target, conditions))
            }
        }
    }

    /// Render `source.*`, expanding joins into the stars of their operands.
    pub fn star_sql(&self, id: SourceId) -> Result<String, DbError> {
        match self.sources.get(id) {
            Source::Join(join) => Ok(format!(
                "{}, {}",
                self.star_sql(join.base)?,
                self.star_sql(join.target)?
            )),
            _ => Ok(format!("{}.*", self.quote(self.source_name(id)?))),
        }
    }

    fn validate_foreign_key(&self, join: &Join) -> Result<(), DbError> {
        if join.foreign_key.is_empty() {
            return Err(DbError::SchemaMismatch {
                message: format!("association {} has no foreign key columns", join.variant_name),
            });
        }
        let origin_columns = join.foreign_key.iter().map(|(origin, _)| origin.as_str());
        self.check_columns(join, join.origin, origin_columns)?;
        let target_columns = join.foreign_key.iter().map(|(_, target)| target.as_str());
        self.check_columns(join, join.target, target_columns)
    }

    fn check_columns<'c>(
        &self,
        join: &Join,
        id: SourceId,
        columns: impl Iterator<Item = &'c str>,
    ) -> Result<(), DbError> {
        let Source::Table { table, .. } = self.sources.get(id) else {
            return Ok(());
        };
        let known = self.db.table_columns(table)?;
        for column in columns {
            if !known.iter().any(|k| k.eq_ignore_ascii_case(column)) {
                return Err(DbError::SchemaMismatch {
                    message: format!(
                        "association {} references missing column {}.{}",
                        join.variant_name, table, column
                    ),
                });
            }
        }
        Ok(())
    }
}
