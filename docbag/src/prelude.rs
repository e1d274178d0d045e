//! Convenient re-exports of commonly used types from docbag.
//!
//! Import this prelude module to quickly access the most frequently used
//! types without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbag::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document type declaration and the catalog
//! - Fields and their policies
//! - Instances, values, and document lists
//! - Query construction and filtering
//! - Collection interfaces and the CRUD controller
//! - Error types

pub use docbag_core::{
    catalog::Catalog,
    collection::{Collection, TypedCollection},
    controller::Controller,
    document::{DocumentType, TypeBuilder},
    error::{Error, Result},
    field::{Field, FieldKind, Policy},
    instance::{DocumentList, Instance, Value, Values},
    query::{Expr, FieldOp, Query, QueryBuilder, QueryField, QueryVisitor, Sort, SortDirection},
};
