//! SELECT query builder.
//!
//! `SelectQuery` is a value: builder methods consume and return it, and
//! lowering never mutates it. Lowering the same query twice yields the same
//! SQL and arguments.
//!
//! # Example
//!
//! ```ignore
//! let query = SelectQuery::table("persons")
//!     .filter(column("age").ge(18))
//!     .order([column("name").asc()])
//!     .limit(10, None);
//!
//! let rows = fetch_all(&db, &query)?;
//! let total = query.fetch_count(&db)?;
//! ```

use tracing::warn;

use crate::db::{fetch_one, Database, DbError, RowAdapter};

use super::association::Association;
use super::expression::{Expression, Selectable, SortDescriptor};
use super::helpers::join_lowered;
use super::params::Bindings;
use super::source::{LoweringContext, Source, SourceId, SourceTree};
use super::QueryBuilder;

/// LIMIT and optional OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub limit: usize,
    pub offset: Option<usize>,
}

impl Limit {
    fn sql(&self) -> String {
        match self.offset {
            Some(offset) => format!("{} OFFSET {}", self.limit, offset),
            None => self.limit.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub(crate) selection: Vec<Selectable>,
    pub(crate) distinct: bool,
    pub(crate) sources: SourceTree,
    pub(crate) filter: Option<Expression>,
    pub(crate) group_by: Vec<Expression>,
    pub(crate) order_by: Vec<SortDescriptor>,
    pub(crate) reversed: bool,
    pub(crate) having: Option<Expression>,
    pub(crate) limit: Option<Limit>,
}

impl SelectQuery {
    /// A query without a FROM clause, e.g. `SELECT 1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT * FROM table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self::from_source(Source::table(table))
    }

    /// `SELECT * FROM (query) AS alias`.
    pub fn from_query(query: SelectQuery, alias: Option<&str>) -> Self {
        Self::from_source(Source::query(query, alias.map(str::to_string)))
    }

    fn from_source(source: Source) -> Self {
        let sources = SourceTree::with_root(source);
        let selection = sources.root().map(Selectable::Star).into_iter().collect();
        Self {
            selection,
            sources,
            ..Self::default()
        }
    }

    /// The root source, before any join was attached.
    pub fn source(&self) -> Option<SourceId> {
        self.sources
            .root()
            .map(|root| self.sources.left_source_for_joins(root))
    }

    pub fn sources(&self) -> &SourceTree {
        &self.sources
    }

    /// Alias the root source.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        if let Some(id) = self.source() {
            match self.sources.get_mut(id) {
                Source::Table { alias: a, .. } | Source::Query { alias: a, .. } => {
                    *a = Some(alias.into())
                }
                Source::Join(_) => {}
            }
        }
        self
    }

    /// Replace the selection.
    pub fn select<I, S>(mut self, selection: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selectable>,
    {
        self.selection = selection.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition, AND-ed with any existing one.
    pub fn filter(mut self, predicate: impl Into<Expression>) -> Self {
        let predicate = predicate.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn group<I, E>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.group_by = expressions.into_iter().map(Into::into).collect();
        self
    }

    /// Add a HAVING condition, AND-ed with any existing one.
    pub fn having(mut self, predicate: impl Into<Expression>) -> Self {
        let predicate = predicate.into();
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Replace the ordering.
    pub fn order<I, S>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SortDescriptor>,
    {
        self.order_by = descriptors.into_iter().map(Into::into).collect();
        self
    }

    /// Flip the ordering.
    ///
    /// Without an explicit ordering the query is ordered by descending row
    /// id, which lowering rejects for sources that have none.
    pub fn reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    pub fn limit(mut self, limit: usize, offset: Option<usize>) -> Self {
        self.limit = Some(Limit { limit, offset });
        self
    }

    /// Left-join an association onto the root source and select its columns.
    pub fn include(mut self, association: Association) -> Self {
        let Some(origin) = self.source() else {
            warn!(association = association.name(), "include on a query without source ignored");
            return self;
        };
        association.attach(&mut self, origin);
        self
    }

    /// Same as `include`.
    pub fn join(self, association: Association) -> Self {
        self.include(association)
    }

    pub(crate) fn unordered(&self) -> Self {
        let mut query = self.clone();
        query.order_by.clear();
        query.reversed = false;
        query
    }

    /// The query counting the rows of this one.
    pub fn count_query(&self) -> SelectQuery {
        if !self.group_by.is_empty() || self.limit.is_some() {
            return self.trivial_count_query();
        }
        let Some(root) = self.sources.root() else {
            return self.trivial_count_query();
        };
        if !matches!(self.sources.get(root), Source::Table { .. }) {
            return self.trivial_count_query();
        }

        if self.selection.len() == 1 {
            match &self.selection[0] {
                Selectable::Star(source) if *source == root && !self.distinct => {
                    self.unordered().select([Expression::CountAll])
                }
                Selectable::Star(_) => self.trivial_count_query(),
                Selectable::Expression { expression, .. } if self.distinct => {
                    let mut query = self.unordered();
                    query.distinct = false;
                    query.select([Expression::CountDistinct(Box::new(expression.clone()))])
                }
                Selectable::Expression { .. } => self.unordered().select([Expression::CountAll]),
            }
        } else if !self.distinct {
            self.unordered().select([Expression::CountAll])
        } else {
            self.trivial_count_query()
        }
    }

    fn trivial_count_query(&self) -> SelectQuery {
        SelectQuery {
            selection: vec![Selectable::from(Expression::CountAll)],
            sources: SourceTree::with_root(Source::query(self.unordered(), None)),
            ..SelectQuery::default()
        }
    }

    /// Run the count query and decode its single integer.
    pub fn fetch_count(&self, db: &dyn Database) -> Result<i64, DbError> {
        let row = fetch_one(db, &self.count_query())?;
        Ok(row.and_then(|row| row.get_opt::<i64>(0)).unwrap_or(0))
    }

    /// Number of result columns.
    pub fn column_count(&self, db: &dyn Database) -> Result<usize, DbError> {
        if self.selection.is_empty() {
            return match self.sources.root() {
                Some(root) => self.sources.column_count(root, db),
                None => Ok(0),
            };
        }
        let mut count = 0;
        for selectable in &self.selection {
            count += self.selection_width(selectable, db)?;
        }
        Ok(count)
    }

    fn selection_width(&self, selectable: &Selectable, db: &dyn Database) -> Result<usize, DbError> {
        match selectable {
            Selectable::Star(source) => self.sources.column_count(*source, db),
            Selectable::Expression { .. } => Ok(1),
        }
    }

    /// The adapter exposing each included association as a variant.
    ///
    /// `None` when nothing was included.
    pub fn row_adapter(&self, db: &dyn Database) -> Result<Option<RowAdapter>, DbError> {
        let Some(root) = self.source() else {
            return Ok(None);
        };
        if !self.sources.has_joins() {
            return Ok(None);
        }
        let mut offsets = Vec::with_capacity(self.selection.len());
        let mut offset = 0;
        for selectable in &self.selection {
            offsets.push(offset);
            offset += self.selection_width(selectable, db)?;
        }
        Ok(Some(RowAdapter::Nested {
            main: Box::new(RowAdapter::Identity),
            variants: self.variant_adapters(root, &offsets, db)?,
        }))
    }

    fn variant_adapters(
        &self,
        origin: SourceId,
        offsets: &[usize],
        db: &dyn Database,
    ) -> Result<Vec<(String, RowAdapter)>, DbError> {
        let mut variants = Vec::new();
        for join in self.sources.joins().filter(|join| join.origin == origin) {
            match self.selection.get(join.selection_index) {
                Some(Selectable::Star(source)) if *source == join.target => {}
                _ => continue,
            }
            let start = offsets[join.selection_index];
            let width = self.sources.column_count(join.target, db)?;
            let adapter = RowAdapter::Nested {
                main: Box::new(RowAdapter::Range(start..start + width)),
                variants: self.variant_adapters(join.target, offsets, db)?,
            };
            variants.push((join.variant_name.clone(), adapter));
        }
        Ok(variants)
    }

    /// Render SQL, appending arguments to `bindings`.
    pub fn lower(&self, db: &dyn Database, bindings: &mut Bindings) -> Result<String, DbError> {
        if self.selection.is_empty() && self.sources.root().is_none() {
            return Err(DbError::EmptySelection);
        }
        let ctx = LoweringContext::new(db, &self.sources);
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.selects_bare_star() {
            sql.push('*');
        } else {
            sql.push_str(&join_lowered(&self.selection, ", ", |s| s.sql(&ctx, bindings))?);
        }

        if let Some(root) = self.sources.root() {
            sql.push_str(" FROM ");
            sql.push_str(&ctx.source_sql(root, bindings)?);
        }

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.sql(&ctx, bindings)?);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&join_lowered(&self.group_by, ", ", |e| e.sql(&ctx, bindings))?);
        }

        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.sql(&ctx, bindings)?);
        }

        let ordering = self.ordering_sql(&ctx, bindings)?;
        if !ordering.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&ordering);
        }

        if let Some(limit) = &self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.sql());
        }
        Ok(sql)
    }

    /// An empty selection of a query with a source selects every column.
    fn selects_bare_star(&self) -> bool {
        let Some(root) = self.sources.root() else {
            return false;
        };
        if self.selection.is_empty() {
            return true;
        }
        match self.selection.as_slice() {
            [Selectable::Star(source)] => {
                *source == root && !matches!(self.sources.get(root), Source::Join(_))
            }
            _ => false,
        }
    }

    fn ordering_sql(&self, ctx: &LoweringContext<'_>, bindings: &mut Bindings) -> Result<String, DbError> {
        if !self.reversed {
            return join_lowered(&self.order_by, ", ", |d| d.sql(ctx, bindings));
        }
        if self.order_by.is_empty() {
            return self.reversed_rowid_sql(ctx);
        }
        let reversed: Vec<SortDescriptor> = self.order_by.iter().map(SortDescriptor::reversed).collect();
        join_lowered(&reversed, ", ", |d| d.sql(ctx, bindings))
    }

    fn reversed_rowid_sql(&self, ctx: &LoweringContext<'_>) -> Result<String, DbError> {
        let reject = |message: String| {
            warn!(%message, "rejecting reversed query");
            Err(DbError::UnsupportedReversal { message })
        };
        let Some(source) = self.source() else {
            return reject("query has no source to order by row id".to_string());
        };
        let Source::Table { table, .. } = self.sources.get(source) else {
            return reject("subquery has no row id; order it explicitly".to_string());
        };
        if !ctx.db().table_has_rowid(table)? {
            return reject(format!("{} has no row id; order it explicitly", table));
        }
        if ctx
            .db()
            .table_columns(table)?
            .iter()
            .any(|column| column.eq_ignore_ascii_case("_rowid_"))
        {
            return reject(format!("table {} shadows _rowid_; order it explicitly", table));
        }
        Ok(format!("{}._rowid_ DESC", ctx.quote(ctx.source_name(source)?)))
    }
}

impl QueryBuilder for SelectQuery {
    fn compile(&self, db: &dyn Database, bindings: &mut Bindings) -> Result<String, DbError> {
        self.lower(db, bindings)
    }

    fn adapter(&self, db: &dyn Database) -> Result<Option<RowAdapter>, DbError> {
        self.row_adapter(db)
    }
}
