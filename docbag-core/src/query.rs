//! Query construction for document stores.
//!
//! This module provides type-safe query construction with filtering, sorting,
//! pagination, and a visitor pattern for query execution across backends.
//!
//! # Query Building
//!
//! Filter expressions are usually obtained through a registered type, which
//! confines them to declared fields:
//!
//! ```ignore
//! let account = catalog.get("Account").unwrap();
//! let expr = account.query("name")?.eq("Alice")
//!     .and(account.query("age")?.gt(18));
//!
//! let query = Query::builder()
//!     .filter(expr)
//!     .limit(10)
//!     .sort("name", SortDirection::Asc)
//!     .build();
//! ```
//!
//! # Criterion Documents
//!
//! [`Expr::to_criterion`] compiles an expression into the wire-level
//! criterion mapping a store consumes:
//!
//! - `eq` emits the plain `{ field: value }` form.
//! - Every other comparison emits `{ field: { "$op": value } }`.
//! - Logical combinators emit `$and` / `$or` / `$not` wrappers.

use bson::{doc, Bson, Document};

use crate::error::Error;

/// Sort direction for query results.
#[derive(Debug, Clone)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Value is any of the listed values.
    AnyOf,
    /// Value is none of the listed values.
    NoneOf,
}

/// A filter expression for querying documents.
///
/// Expressions combine through [`and`](Expr::and), [`or`](Expr::or), and
/// [`not`](Expr::not) into arbitrarily nested predicates.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Compiles this expression into a wire-level criterion mapping.
    pub fn to_criterion(&self) -> Result<Document, Error> {
        CriterionCompiler.visit_expr(self)
    }
}

/// A handle on one declared field, from which comparison expressions are
/// built.
///
/// Obtained through [`DocumentType::query`](crate::document::DocumentType::query),
/// so an expression can only name fields the type actually declares.
#[derive(Debug, Clone)]
pub struct QueryField {
    path: String,
}

impl QueryField {
    pub(crate) fn new(path: &str) -> Self {
        Self { path: path.to_string() }
    }

    /// The field path this handle projects.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Matches documents where the field equals the value.
    pub fn eq(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Ne, value.into())
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Gt, value.into())
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Gte, value.into())
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Lt, value.into())
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(&self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.path.clone(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the field is any of the listed values.
    pub fn any_of(&self, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        Expr::field(self.path.clone(), FieldOp::AnyOf, Bson::Array(values))
    }

    /// Matches documents where the field is none of the listed values.
    pub fn none_of(&self, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        Expr::field(self.path.clone(), FieldOp::NoneOf, Bson::Array(values))
    }

    /// Matches documents where the field is present.
    pub fn exists(&self) -> Expr {
        Expr::Exists(self.path.clone(), true)
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(&self) -> Expr {
        Expr::Exists(self.path.clone(), false)
    }
}

/// A structured query for retrieving and filtering documents.
///
/// This struct encapsulates filters, limits, offsets, and sort specifications
/// for document queries. Use [`QueryBuilder`] for ergonomic construction.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip (for pagination).
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

impl From<Expr> for Query {
    fn from(filter: Expr) -> Self {
        Query {
            filter: Some(filter),
            ..Query::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip (for pagination).
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Sets the sort specification for the query results.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<Error>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

/// Compiles filter expressions into wire-level criterion documents.
struct CriterionCompiler;

impl QueryVisitor for CriterionCompiler {
    type Output = Document;
    type Error = Error;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$not": self.visit_expr(expr)?,
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                // Plain equality keeps the short criterion form.
                FieldOp::Eq => return Ok(doc! { field: value.clone() }),
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf => doc! { "$in": value },
                FieldOp::NoneOf => doc! { "$nin": value },
            }
        })
    }
}
