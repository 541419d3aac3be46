//! Associations: declarative left joins addressable as row variants.
//!
//! ```ignore
//! let leader = Association::belongs_to("leader", "persons", [("leaderID", "id")]);
//! let birth_country =
//!     Association::belongs_to("birthCountry", "countries", [("birthCountryIsoCode", "isoCode")]);
//!
//! let query = SelectQuery::table("persons").include(birth_country.include(leader));
//! for row in fetch_all(&db, &query)? {
//!     let leader = row.variant("birthCountry").and_then(|c| c.variant("leader"));
//! }
//! ```
//!
//! Nested includes apply to the association's target, not to the query
//! root. Associations are plain values: reusing one, even recursively for a
//! self-join, needs no copy because aliases are assigned at lowering time.

use super::expression::Selectable;
use super::select::SelectQuery;
use super::source::{Join, Source, SourceId};

/// Direction of the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// The origin holds the foreign key to the target.
    BelongsTo,
    /// The target holds the foreign key to the origin.
    HasOne,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    name: String,
    kind: AssociationKind,
    table: String,
    alias: Option<String>,
    foreign_key: Vec<(String, String)>,
    includes: Vec<Association>,
}

impl Association {
    /// The origin row references one target row.
    ///
    /// `foreign_key` holds `(origin column, target column)` pairs, e.g.
    /// `[("authorId", "id")]`. The target is aliased with `name` when the
    /// name differs from the table.
    pub fn belongs_to<I, O, T>(name: impl Into<String>, table: impl Into<String>, foreign_key: I) -> Self
    where
        I: IntoIterator<Item = (O, T)>,
        O: Into<String>,
        T: Into<String>,
    {
        let name = name.into();
        let table = table.into();
        let alias = (name != table).then(|| name.clone());
        Self::new(AssociationKind::BelongsTo, name, table, alias, foreign_key)
    }

    /// One target row references the origin row.
    ///
    /// `foreign_key` holds `(origin column, target column)` pairs, e.g.
    /// `[("id", "parentId")]`. The target keeps its table name.
    pub fn has_one<I, O, T>(name: impl Into<String>, table: impl Into<String>, foreign_key: I) -> Self
    where
        I: IntoIterator<Item = (O, T)>,
        O: Into<String>,
        T: Into<String>,
    {
        Self::new(AssociationKind::HasOne, name.into(), table.into(), None, foreign_key)
    }

    fn new<I, O, T>(
        kind: AssociationKind,
        name: String,
        table: String,
        alias: Option<String>,
        foreign_key: I,
    ) -> Self
    where
        I: IntoIterator<Item = (O, T)>,
        O: Into<String>,
        T: Into<String>,
    {
        Self {
            name,
            kind,
            table,
            alias,
            foreign_key: foreign_key
                .into_iter()
                .map(|(origin, target)| (origin.into(), target.into()))
                .collect(),
            includes: Vec::new(),
        }
    }

    /// The variant name joined rows are addressable by.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// An independent copy.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Alias the target table in SQL.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Chain an association resolved relative to this one's target.
    pub fn include(mut self, association: Association) -> Self {
        self.includes.push(association);
        self
    }

    /// Same as `include`.
    pub fn join(self, association: Association) -> Self {
        self.include(association)
    }

    /// Join onto `origin`, then attach nested includes to the new target.
    pub(crate) fn attach(self, query: &mut SelectQuery, origin: SourceId) {
        let Some(base) = query.sources.root() else {
            return;
        };
        let target = query.sources.push(Source::Table {
            table: self.table,
            alias: self.alias,
        });
        let selection_index = query.selection.len();
        query.selection.push(Selectable::Star(target));
        let join = query.sources.push(Source::Join(Join {
            base,
            origin,
            target,
            foreign_key: self.foreign_key,
            kind: self.kind,
            variant_name: self.name,
            selection_index,
        }));
        query.sources.set_root(join);
        for nested in self.includes {
            nested.attach(query, target);
        }
    }
}
