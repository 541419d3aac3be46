//! Query construction: expressions, sources, associations, and the lowering
//! of `SelectQuery` requests into SQL plus positional arguments.

pub mod builder;
