//! CRUD controller over a typed collection.
//!
//! The [`Controller`] pairs a registered document type with a storage
//! collection and exposes the five persistence operations: create, read,
//! search, update, delete. Single-result reads are strict: zero matches is
//! [`Error::NoResultFound`] and more than one is
//! [`Error::MultipleResultsFound`].
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! # fn example(catalog: &Catalog, backend: impl Collection) -> docbag::error::Result<()> {
//! let account = catalog.get("Account").unwrap();
//! let controller = Controller::new(TypedCollection::new(catalog, account.clone(), backend));
//!
//! let doc = controller.create(Values::new().with("name", "Alice"))?;
//! let found = controller.read(&account.query("name")?.eq("Alice"))?;
//! assert_eq!(doc, found);
//! # Ok(()) }
//! ```

use crate::collection::{Collection, TypedCollection};
use crate::error::{Error, Result};
use crate::instance::{Instance, Values};
use crate::query::{Expr, Query};

/// The persistence operations for one document type.
pub struct Controller<'a, C: Collection> {
    collection: TypedCollection<'a, C>,
}

impl<'a, C: Collection> Controller<'a, C> {
    /// Creates a controller over a typed collection.
    pub fn new(collection: TypedCollection<'a, C>) -> Self {
        Self { collection }
    }

    /// The typed collection this controller operates on.
    pub fn collection(&self) -> &TypedCollection<'a, C> {
        &self.collection
    }

    /// Validates, stores, and returns a new document.
    ///
    /// The returned instance carries the identity the store assigned.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when the values do not construct a valid document.
    pub fn create(&self, values: Values) -> Result<Instance> {
        let ty = self.collection.document_type().clone();
        let catalog = self.collection.catalog();
        let mut document = Instance::new(&ty, catalog, values)?;
        let id = self.collection.insert(&document)?;
        document.set(catalog, "_id", id)?;
        Ok(document)
    }

    /// Returns exactly one document matching the filter.
    ///
    /// # Errors
    ///
    /// - [`Error::NoResultFound`] when nothing matches.
    /// - [`Error::MultipleResultsFound`] when more than one document matches.
    pub fn read(&self, filter: &Expr) -> Result<Instance> {
        // Two rows are enough to prove ambiguity.
        let query = Query::builder().filter(filter.clone()).limit(2).build();
        let mut found = self.collection.find(&query)?;
        match found.len() {
            0 => Err(Error::NoResultFound(describe(filter))),
            1 => Ok(found.remove(0)),
            _ => Err(Error::MultipleResultsFound(describe(filter))),
        }
    }

    /// Returns every document matching the query.
    pub fn search(&self, query: Query) -> Result<Vec<Instance>> {
        self.collection.find(&query)
    }

    /// Validates the given values and replaces the stored document of the
    /// same identity, inserting it when no document carries that identity.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when no `_id` value is supplied or the values do not
    /// construct a valid document.
    pub fn update(&self, values: Values) -> Result<Instance> {
        let document = self.identified(values, "update")?;
        let filter = self.identity_filter(&document)?;
        self.collection.update(&filter, &document, true)?;
        Ok(document)
    }

    /// Deletes the stored document with the identity in the given values.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when no `_id` value is supplied or the values do not
    /// construct a valid document.
    pub fn delete(&self, values: Values) -> Result<()> {
        let document = self.identified(values, "delete")?;
        let filter = self.identity_filter(&document)?;
        self.collection.remove(&filter)
    }

    /// Rebuilds an instance from values that must carry an identity.
    fn identified(&self, values: Values, operation: &str) -> Result<Instance> {
        let ty = self.collection.document_type().clone();
        if !values.contains("_id") {
            return Err(Error::Type(format!(
                "an ObjectId '_id' value is required to {operation} a {}",
                ty.name()
            )));
        }
        Instance::new(&ty, self.collection.catalog(), values)
    }

    fn identity_filter(&self, document: &Instance) -> Result<Expr> {
        let id = document.id().ok_or_else(|| {
            Error::Type(format!(
                "'_id' did not resolve to an ObjectId for {}",
                document.type_name()
            ))
        })?;
        Ok(self.collection.document_type().query("_id")?.eq(id))
    }
}

fn describe(filter: &Expr) -> String {
    match filter.to_criterion() {
        Ok(criterion) => criterion.to_string(),
        Err(_) => format!("{filter:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::Catalog;
    use crate::document::DocumentType;
    use crate::field::Field;

    /// A backend that must never be reached.
    struct Unreachable;

    impl Collection for Unreachable {
        fn insert(&self, _document: bson::Document) -> Result<bson::oid::ObjectId> {
            panic!("backend reached");
        }
        fn find_one(&self, _filter: &Expr) -> Result<Option<bson::Document>> {
            panic!("backend reached");
        }
        fn find(&self, _query: &Query) -> Result<Vec<bson::Document>> {
            panic!("backend reached");
        }
        fn update(&self, _filter: &Expr, _document: bson::Document, _upsert: bool) -> Result<()> {
            panic!("backend reached");
        }
        fn remove(&self, _filter: &Expr) -> Result<()> {
            panic!("backend reached");
        }
    }

    fn account(catalog: &mut Catalog) -> Arc<DocumentType> {
        DocumentType::builder("Account")
            .field("name", Field::string())
            .register(catalog)
            .unwrap()
    }

    #[test]
    fn update_and_delete_require_an_identity() {
        let mut catalog = Catalog::new();
        let ty = account(&mut catalog);
        let controller =
            Controller::new(TypedCollection::new(&catalog, ty, Unreachable));

        let err = controller
            .update(Values::new().with("name", "Alice"))
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));

        let err = controller
            .delete(Values::new().with("name", "Alice"))
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn invalid_values_fail_before_the_backend() {
        let mut catalog = Catalog::new();
        let ty = account(&mut catalog);
        let controller =
            Controller::new(TypedCollection::new(&catalog, ty, Unreachable));

        let err = controller
            .create(Values::new().with("nickname", "Alice"))
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }
}
