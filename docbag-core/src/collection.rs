//! Collection abstractions for document store operations.
//!
//! This module defines the seam between the mapping layer and storage:
//!
//! - [`Collection`] - Wire-level handle on one named collection, implemented
//!   by storage backends. Everything crossing it is a BSON document.
//! - [`TypedCollection`] - Decorates a [`Collection`] with a registered
//!   document type, converting instances to wire mappings on the way out and
//!   reviving results polymorphically on the way in.
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! # fn example(catalog: &Catalog, backend: impl Collection) -> docbag::error::Result<()> {
//! let account = catalog.get("Account").unwrap();
//! let accounts = TypedCollection::new(catalog, account.clone(), backend);
//!
//! let doc = Instance::new(&account, catalog, Values::new().with("name", "Alice"))?;
//! let id = accounts.insert(&doc)?;
//! let found = accounts.find_one(&account.query("_id")?.eq(id))?;
//! # Ok(()) }
//! ```

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::catalog::Catalog;
use crate::document::DocumentType;
use crate::error::Result;
use crate::instance::Instance;
use crate::query::{Expr, Query};

/// A wire-level handle on one named collection of documents.
///
/// Implemented by storage backends; the mapping layer never reaches past it.
/// Filters arrive as [`Expr`] trees so each backend can translate them into
/// its own matching machinery.
pub trait Collection {
    /// Stores a new document, assigning an identity when the mapping lacks
    /// one, and returns the identity under which it was stored.
    fn insert(&self, document: bson::Document) -> Result<ObjectId>;

    /// Returns the first document matching the filter, if any.
    fn find_one(&self, filter: &Expr) -> Result<Option<bson::Document>>;

    /// Returns every document matching the query, honoring its sort, offset,
    /// and limit.
    fn find(&self, query: &Query) -> Result<Vec<bson::Document>>;

    /// Replaces the first document matching the filter with `document`.
    ///
    /// With `upsert`, a non-matching filter stores the document instead.
    fn update(&self, filter: &Expr, document: bson::Document, upsert: bool) -> Result<()>;

    /// Deletes every document matching the filter.
    fn remove(&self, filter: &Expr) -> Result<()>;
}

/// A [`Collection`] decorated with a registered document type.
///
/// Outgoing instances serialize to their sparse wire mapping; incoming
/// mappings are revived through the catalog, so results surface as whichever
/// registered type their keys fit.
pub struct TypedCollection<'a, C: Collection> {
    catalog: &'a Catalog,
    ty: Arc<DocumentType>,
    inner: C,
}

impl<'a, C: Collection> TypedCollection<'a, C> {
    /// Wraps a wire-level collection with a document type.
    pub fn new(catalog: &'a Catalog, ty: Arc<DocumentType>, inner: C) -> Self {
        Self { catalog, ty, inner }
    }

    /// The document type this collection is bound to.
    pub fn document_type(&self) -> &Arc<DocumentType> {
        &self.ty
    }

    /// The catalog used to revive results.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Stores an instance's wire mapping, returning the stored identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn insert(&self, document: &Instance) -> Result<ObjectId> {
        self.inner.insert(document.serialize())
    }

    /// Returns the first matching document as a revived instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored mapping does not
    /// revive as any registered type.
    pub fn find_one(&self, filter: &Expr) -> Result<Option<Instance>> {
        match self.inner.find_one(filter)? {
            Some(document) => Ok(Some(self.catalog.deserialize(self.ty.name(), document)?)),
            None => Ok(None),
        }
    }

    /// Returns every matching document as revived instances.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or any stored mapping does not
    /// revive as a registered type.
    pub fn find(&self, query: &Query) -> Result<Vec<Instance>> {
        self.inner
            .find(query)?
            .into_iter()
            .map(|document| self.catalog.deserialize(self.ty.name(), document))
            .collect()
    }

    /// Replaces the first matching document with the instance's wire mapping.
    pub fn update(&self, filter: &Expr, document: &Instance, upsert: bool) -> Result<()> {
        self.inner.update(filter, document.serialize(), upsert)
    }

    /// Deletes every matching document.
    pub fn remove(&self, filter: &Expr) -> Result<()> {
        self.inner.remove(filter)
    }
}
