//! In-memory document storage backend for docbag.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `Collection` trait. It is ideal for development, testing, and
//! small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes behind a RwLock
//! - **Type-erased storage** - Stores documents as BSON for flexibility
//! - **Full query support** - Supports filtering, sorting, and pagination
//! - **Insertion-order results** - Unsorted queries return documents in the
//!   order they were stored
//!
//! # Quick Start
//!
//! ```ignore
//! use docbag::prelude::*;
//! use docbag::memory::MemoryStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut catalog = Catalog::new();
//!     let account = DocumentType::builder("Account")
//!         .field("name", Field::string())
//!         .register(&mut catalog)?;
//!
//!     let store = MemoryStore::new();
//!     let accounts = Controller::new(TypedCollection::new(
//!         &catalog,
//!         account.clone(),
//!         store.collection("account"),
//!     ));
//!
//!     accounts.create(Values::new().with("name", "Alice"))?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbag_memory;

pub mod evaluator;
pub mod store;

pub use store::{MemoryCollection, MemoryStore};
