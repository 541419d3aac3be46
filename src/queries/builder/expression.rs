//! SQL expressions, selectables and sort descriptors.
//!
//! An `Expression` is an immutable tree. Lowering renders SQL text and
//! appends one positional argument per `?`, left to right. Values are never
//! interpolated into the text.
//!
//! Lowering simplifies a few shapes instead of emitting them literally:
//!
//! - comparisons against a NULL value become `IS NULL` / `IS NOT NULL`
//! - `NOT` over `=`, `<>`, `IS`, `IS NOT`, `IN`, `EXISTS` or another `NOT`
//!   becomes the direct opposite form
//! - `IN` over an empty list is the constant `0` (and `1` when negated)

use std::ops;

use crate::db::{DatabaseValue, DbError};

use super::helpers::{insert_collation, join_lowered};
use super::params::Bindings;
use super::select::SelectQuery;
use super::source::{LoweringContext, SourceId};

/// What an identifier is qualified with.
#[derive(Debug, Clone, PartialEq)]
pub enum Qualifier {
    /// A source of the query being lowered; renders its resolved name.
    Source(SourceId),
    /// A name rendered verbatim, e.g. an outer query's alias.
    Named(String),
}

impl From<SourceId> for Qualifier {
    fn from(id: SourceId) -> Self {
        Qualifier::Source(id)
    }
}

impl From<&str> for Qualifier {
    fn from(name: &str) -> Self {
        Qualifier::Named(name.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(String),
    Value(DatabaseValue),
    Identifier {
        name: String,
        qualifier: Option<Qualifier>,
    },
    Collate {
        expression: Box<Expression>,
        collation: String,
    },
    Not(Box<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    Is(Box<Expression>, Box<Expression>),
    IsNot(Box<Expression>, Box<Expression>),
    Prefix {
        operator: String,
        operand: Box<Expression>,
    },
    Infix {
        operator: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    In {
        candidates: Vec<Expression>,
        value: Box<Expression>,
    },
    InSubQuery {
        query: Box<SelectQuery>,
        value: Box<Expression>,
    },
    Exists(Box<SelectQuery>),
    Between {
        value: Box<Expression>,
        min: Box<Expression>,
        max: Box<Expression>,
    },
    Function {
        name: String,
        arguments: Vec<Expression>,
    },
    CountAll,
    Count(Box<Expression>),
    CountDistinct(Box<Expression>),
}

/// An unqualified column.
pub fn column(name: impl Into<String>) -> Expression {
    Expression::Identifier {
        name: name.into(),
        qualifier: None,
    }
}

/// A bound value.
pub fn value(value: impl Into<DatabaseValue>) -> Expression {
    Expression::Value(value.into())
}

/// Raw SQL, rendered as is.
pub fn literal(sql: impl Into<String>) -> Expression {
    Expression::Literal(sql.into())
}

pub fn exists(query: SelectQuery) -> Expression {
    Expression::Exists(Box::new(query))
}

pub fn not(expression: impl Into<Expression>) -> Expression {
    Expression::Not(Box::new(expression.into()))
}

pub fn and(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    left.into().and(right)
}

pub fn or(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    left.into().or(right)
}

pub fn count(expression: impl Into<Expression>) -> Expression {
    Expression::Count(Box::new(expression.into()))
}

pub fn count_distinct(expression: impl Into<Expression>) -> Expression {
    Expression::CountDistinct(Box::new(expression.into()))
}

pub fn count_all() -> Expression {
    Expression::CountAll
}

/// A function call; the name is uppercased when rendered.
pub fn function<I, E>(name: impl Into<String>, arguments: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::Function {
        name: name.into(),
        arguments: arguments.into_iter().map(Into::into).collect(),
    }
}

impl Expression {
    /// A column qualified by a source or a verbatim name.
    pub fn qualified(qualifier: impl Into<Qualifier>, name: impl Into<String>) -> Self {
        Expression::Identifier {
            name: name.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    fn infix(self, operator: &str, right: impl Into<Expression>) -> Self {
        Expression::Infix {
            operator: operator.to_string(),
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expression>) -> Self {
        Expression::Equal(Box::new(self), Box::new(other.into()))
    }

    pub fn ne(self, other: impl Into<Expression>) -> Self {
        Expression::NotEqual(Box::new(self), Box::new(other.into()))
    }

    pub fn is(self, other: impl Into<Expression>) -> Self {
        Expression::Is(Box::new(self), Box::new(other.into()))
    }

    pub fn is_not(self, other: impl Into<Expression>) -> Self {
        Expression::IsNot(Box::new(self), Box::new(other.into()))
    }

    pub fn lt(self, other: impl Into<Expression>) -> Self {
        self.infix("<", other)
    }

    pub fn le(self, other: impl Into<Expression>) -> Self {
        self.infix("<=", other)
    }

    pub fn gt(self, other: impl Into<Expression>) -> Self {
        self.infix(">", other)
    }

    pub fn ge(self, other: impl Into<Expression>) -> Self {
        self.infix(">=", other)
    }

    pub fn like(self, pattern: impl Into<Expression>) -> Self {
        self.infix("LIKE", pattern)
    }

    pub fn and(self, other: impl Into<Expression>) -> Self {
        self.infix("AND", other)
    }

    pub fn or(self, other: impl Into<Expression>) -> Self {
        self.infix("OR", other)
    }

    pub fn between(self, min: impl Into<Expression>, max: impl Into<Expression>) -> Self {
        Expression::Between {
            value: Box::new(self),
            min: Box::new(min.into()),
            max: Box::new(max.into()),
        }
    }

    pub fn is_in<I, E>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        Expression::In {
            candidates: candidates.into_iter().map(Into::into).collect(),
            value: Box::new(self),
        }
    }

    pub fn in_subquery(self, query: SelectQuery) -> Self {
        Expression::InSubQuery {
            query: Box::new(query),
            value: Box::new(self),
        }
    }

    pub fn collate(self, collation: impl Into<String>) -> Self {
        Expression::Collate {
            expression: Box::new(self),
            collation: collation.into(),
        }
    }

    pub fn asc(self) -> SortDescriptor {
        SortDescriptor::Asc(self)
    }

    pub fn desc(self) -> SortDescriptor {
        SortDescriptor::Desc(self)
    }

    pub fn aliased(self, alias: impl Into<String>) -> Selectable {
        Selectable::Expression {
            expression: self,
            alias: Some(alias.into()),
        }
    }

    fn is_null_value(&self) -> bool {
        matches!(self, Expression::Value(DatabaseValue::Null))
    }

    /// Render SQL, appending arguments to `bindings`.
    pub fn sql(&self, ctx: &LoweringContext<'_>, bindings: &mut Bindings) -> Result<String, DbError> {
        match self {
            Expression::Literal(sql) => Ok(sql.clone()),
            Expression::Value(DatabaseValue::Null) => Ok("NULL".to_string()),
            Expression::Value(value) => Ok(bindings.push(value.clone()).to_string()),
            Expression::Identifier { name, qualifier } => match qualifier {
                None => Ok(ctx.quote(name)),
                Some(Qualifier::Source(id)) => {
                    Ok(format!("{}.{}", ctx.quote(ctx.source_name(*id)?), ctx.quote(name)))
                }
                Some(Qualifier::Named(source)) => {
                    Ok(format!("{}.{}", ctx.quote(source), ctx.quote(name)))
                }
            },
            Expression::Collate {
                expression,
                collation,
            } => Ok(insert_collation(&expression.sql(ctx, bindings)?, collation)),
            Expression::Not(inner) => inner.negated_sql(ctx, bindings),
            Expression::Equal(left, right) => comparison_sql("=", "IS NULL", left, right, ctx, bindings),
            Expression::NotEqual(left, right) => {
                comparison_sql("<>", "IS NOT NULL", left, right, ctx, bindings)
            }
            Expression::Is(left, right) => comparison_sql("IS", "IS NULL", left, right, ctx, bindings),
            Expression::IsNot(left, right) => {
                comparison_sql("IS NOT", "IS NOT NULL", left, right, ctx, bindings)
            }
            Expression::Prefix { operator, operand } => {
                Ok(format!("{}{}", operator, operand.sql(ctx, bindings)?))
            }
            Expression::Infix {
                operator,
                left,
                right,
            } => {
                let left = left.sql(ctx, bindings)?;
                let right = right.sql(ctx, bindings)?;
                Ok(format!("({} {} {})", left, operator, right))
            }
            Expression::In { candidates, value } => in_sql("IN", candidates, value, ctx, bindings),
            Expression::InSubQuery { query, value } => {
                let value = value.sql(ctx, bindings)?;
                Ok(format!("({} IN ({}))", value, query.lower(ctx.db(), bindings)?))
            }
            Expression::Exists(query) => {
                Ok(format!("(EXISTS ({}))", query.lower(ctx.db(), bindings)?))
            }
            Expression::Between { value, min, max } => {
                let value = value.sql(ctx, bindings)?;
                let min = min.sql(ctx, bindings)?;
                let max = max.sql(ctx, bindings)?;
                Ok(format!("({} BETWEEN {} AND {})", value, min, max))
            }
            Expression::Function { name, arguments } => {
                let arguments = join_lowered(arguments, ", ", |a| a.sql(ctx, bindings))?;
                Ok(format!("{}({})", name.to_uppercase(), arguments))
            }
            Expression::CountAll => Ok("COUNT(*)".to_string()),
            Expression::Count(inner) => Ok(format!("COUNT({})", inner.sql(ctx, bindings)?)),
            Expression::CountDistinct(inner) => {
                Ok(format!("COUNT(DISTINCT {})", inner.sql(ctx, bindings)?))
            }
        }
    }

    /// Render `NOT self`, using the opposite form where one exists.
    fn negated_sql(&self, ctx: &LoweringContext<'_>, bindings: &mut Bindings) -> Result<String, DbError> {
        match self {
            Expression::Not(inner) => inner.sql(ctx, bindings),
            Expression::In { candidates, value } => in_sql("NOT IN", candidates, value, ctx, bindings),
            Expression::InSubQuery { query, value } => {
                let value = value.sql(ctx, bindings)?;
                Ok(format!("({} NOT IN ({}))", value, query.lower(ctx.db(), bindings)?))
            }
            Expression::Exists(query) => {
                Ok(format!("(NOT EXISTS ({}))", query.lower(ctx.db(), bindings)?))
            }
            Expression::Equal(left, right) => {
                comparison_sql("<>", "IS NOT NULL", left, right, ctx, bindings)
            }
            Expression::NotEqual(left, right) => {
                comparison_sql("=", "IS NULL", left, right, ctx, bindings)
            }
            Expression::Is(left, right) => {
                comparison_sql("IS NOT", "IS NOT NULL", left, right, ctx, bindings)
            }
            Expression::IsNot(left, right) => {
                comparison_sql("IS", "IS NULL", left, right, ctx, bindings)
            }
            other => Ok(format!("(NOT {})", other.sql(ctx, bindings)?)),
        }
    }
}

fn comparison_sql(
    operator: &str,
    null_test: &str,
    left: &Expression,
    right: &Expression,
    ctx: &LoweringContext<'_>,
    bindings: &mut Bindings,
) -> Result<String, DbError> {
    if right.is_null_value() {
        return Ok(format!("({} {})", left.sql(ctx, bindings)?, null_test));
    }
    if left.is_null_value() {
        return Ok(format!("({} {})", right.sql(ctx, bindings)?, null_test));
    }
    let left = left.sql(ctx, bindings)?;
    let right = right.sql(ctx, bindings)?;
    Ok(format!("({} {} {})", left, operator, right))
}

fn in_sql(
    operator: &str,
    candidates: &[Expression],
    value: &Expression,
    ctx: &LoweringContext<'_>,
    bindings: &mut Bindings,
) -> Result<String, DbError> {
    if candidates.is_empty() {
        // x IN () is false whatever x is
        return Ok(if operator == "IN" { "0" } else { "1" }.to_string());
    }
    let value = value.sql(ctx, bindings)?;
    let candidates = join_lowered(candidates, ", ", |c| c.sql(ctx, bindings))?;
    Ok(format!("({} {} ({}))", value, operator, candidates))
}

impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        Expression::Not(Box::new(self))
    }
}

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::Prefix {
            operator: "-".to_string(),
            operand: Box::new(self),
        }
    }
}

impl<T: Into<Expression>> ops::Add<T> for Expression {
    type Output = Expression;

    fn add(self, other: T) -> Expression {
        self.infix("+", other)
    }
}

impl<T: Into<Expression>> ops::Sub<T> for Expression {
    type Output = Expression;

    fn sub(self, other: T) -> Expression {
        self.infix("-", other)
    }
}

impl From<DatabaseValue> for Expression {
    fn from(value: DatabaseValue) -> Self {
        Expression::Value(value)
    }
}

impl From<i64> for Expression {
    fn from(v: i64) -> Self {
        Expression::Value(v.into())
    }
}

impl From<i32> for Expression {
    fn from(v: i32) -> Self {
        Expression::Value(v.into())
    }
}

impl From<f64> for Expression {
    fn from(v: f64) -> Self {
        Expression::Value(v.into())
    }
}

impl From<bool> for Expression {
    fn from(v: bool) -> Self {
        Expression::Value(v.into())
    }
}

impl From<&str> for Expression {
    fn from(v: &str) -> Self {
        Expression::Value(v.into())
    }
}

impl From<String> for Expression {
    fn from(v: String) -> Self {
        Expression::Value(v.into())
    }
}

/// An item of a SELECT list.
#[derive(Debug, Clone)]
pub enum Selectable {
    /// Every column of a source.
    Star(SourceId),
    Expression {
        expression: Expression,
        alias: Option<String>,
    },
}

impl Selectable {
    pub fn star(source: SourceId) -> Self {
        Selectable::Star(source)
    }

    pub fn sql(&self, ctx: &LoweringContext<'_>, bindings: &mut Bindings) -> Result<String, DbError> {
        match self {
            Selectable::Star(source) => ctx.star_sql(*source),
            Selectable::Expression { expression, alias } => {
                let sql = expression.sql(ctx, bindings)?;
                match alias {
                    Some(alias) => Ok(format!("{} AS {}", sql, ctx.quote(alias))),
                    None => Ok(sql),
                }
            }
        }
    }
}

impl From<Expression> for Selectable {
    fn from(expression: Expression) -> Self {
        Selectable::Expression {
            expression,
            alias: None,
        }
    }
}

/// An ORDER BY term.
#[derive(Debug, Clone)]
pub enum SortDescriptor {
    Expression(Expression),
    Asc(Expression),
    Desc(Expression),
}

impl SortDescriptor {
    /// The descriptor ordering the other way.
    pub fn reversed(&self) -> Self {
        match self {
            SortDescriptor::Expression(e) | SortDescriptor::Asc(e) => SortDescriptor::Desc(e.clone()),
            SortDescriptor::Desc(e) => SortDescriptor::Asc(e.clone()),
        }
    }

    pub fn sql(&self, ctx: &LoweringContext<'_>, bindings: &mut Bindings) -> Result<String, DbError> {
        match self {
            SortDescriptor::Expression(e) => e.sql(ctx, bindings),
            SortDescriptor::Asc(e) => Ok(format!("{} ASC", e.sql(ctx, bindings)?)),
            SortDescriptor::Desc(e) => Ok(format!("{} DESC", e.sql(ctx, bindings)?)),
        }
    }
}

impl From<Expression> for SortDescriptor {
    fn from(expression: Expression) -> Self {
        SortDescriptor::Expression(expression)
    }
}
