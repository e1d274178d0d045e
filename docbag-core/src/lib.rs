//! A declarative document-mapping layer for document stores.
//!
//! This crate is the core of the docbag project and provides:
//!
//! - **Typed fields** ([`field`]) - Self-validating field definitions with
//!   coercion, defaults, and missing-value policies
//! - **Field registries** ([`registry`]) - Per-type field tables merged
//!   across inheritance
//! - **Document types** ([`document`]) - Declarative schema definitions with
//!   single and multiple inheritance
//! - **The catalog** ([`catalog`]) - Process-wide type registry, schema
//!   propagation, and polymorphic deserialization
//! - **Instances** ([`instance`]) - Schema-validated document values,
//!   embedded documents and document lists
//! - **Query API** ([`query`]) - Field-scoped filter expressions compiled to
//!   wire criterion documents
//! - **Collections** ([`collection`]) - The storage seam and its typed
//!   decorator
//! - **CRUD controller** ([`controller`]) - Create, read, search, update,
//!   delete over a typed collection
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! let mut catalog = Catalog::new();
//! let account = DocumentType::builder("Account")
//!     .field("name", Field::string())
//!     .field("surname", Field::string())
//!     .register(&mut catalog)?;
//!
//! let doc = Instance::new(&account, &catalog, Values::new()
//!     .with("name", "Alice")
//!     .with("surname", "Doe"))?;
//! # Ok::<(), docbag::error::Error>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbag_core;

pub mod catalog;
pub mod collection;
pub mod controller;
pub mod document;
pub mod error;
pub mod field;
pub mod instance;
pub mod query;
pub mod registry;
