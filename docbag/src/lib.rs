//! Main docbag crate providing a declarative document-mapping engine.
//!
//! This crate is the primary entry point for users of the docbag framework.
//! It re-exports the core types from the sub-crates and provides convenient
//! access to the storage backends.
//!
//! Document types are declared at runtime: a [`DocumentType`](document::DocumentType)
//! names its fields, each field validates and coerces the values that pass
//! through it, and subtypes inherit their bases' fields. The
//! [`Catalog`](catalog::Catalog) tracks every registered type and revives
//! stored mappings polymorphically, picking whichever registered type a
//! mapping's keys fit.
//!
//! # Features
//!
//! - **Declarative schemas** - Field-by-field document definitions with
//!   validation, coercion, defaults, and missing-value policies
//! - **Inheritance** - Single and multiple inheritance with field merging
//!   and collection names shared down the hierarchy
//! - **Composition** - Embedded documents and validated document lists
//! - **Polymorphic revival** - Stored mappings come back as the most
//!   specific registered type their keys fit
//! - **Flexible querying** - Field-scoped, composable filter expressions
//!   compiled to wire criterion documents
//!
//! # Quick Start
//!
//! ```ignore
//! use docbag::{prelude::*, memory::MemoryStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut catalog = Catalog::new();
//!     let account = DocumentType::builder("Account")
//!         .field("name", Field::string())
//!         .field("surname", Field::string())
//!         .register(&mut catalog)?;
//!
//!     let store = MemoryStore::new();
//!     let accounts = Controller::new(TypedCollection::new(
//!         &catalog,
//!         account.clone(),
//!         store.collection("account"),
//!     ));
//!
//!     // Create, then read back by field.
//!     accounts.create(Values::new()
//!         .with("name", "Alice")
//!         .with("surname", "Doe"))?;
//!     let doc = accounts.read(&account.query("surname")?.eq("Doe"))?;
//!     println!("found: {:?}", doc);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing

pub mod prelude;

pub use docbag_core::{
    catalog, collection, controller, document, error, field, instance, query, registry,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbag_memory::{MemoryCollection, MemoryStore};
}
