//! In-memory storage for document collections.
//!
//! This module provides a simple but complete in-memory backend that keeps
//! collections as ordered vectors of BSON documents behind a read-write lock.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bson::oid::ObjectId;
use bson::Bson;

use docbag_core::{
    collection::Collection,
    error::{Error, Result},
    query::{Expr, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

type CollectionVec = Vec<bson::Document>;
type StoreMap = HashMap<String, CollectionVec>;

/// Thread-safe in-memory document storage.
///
/// Collections are created lazily on first insert and keep their documents
/// in insertion order, so unsorted queries return documents in the order
/// they were stored.
///
/// `MemoryStore` is cloneable and uses an `Arc`-wrapped internal state;
/// clones of the same store share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). For small to
/// medium datasets this is typically acceptable.
///
/// # Example
///
/// ```ignore
/// use docbag_memory::MemoryStore;
/// use docbag::collection::Collection;
///
/// let store = MemoryStore::new();
/// let users = store.collection("users");
/// let id = users.insert(bson::doc! { "name": "Alice" })?;
/// # Ok::<(), docbag::error::Error>(())
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    /// The main storage map: collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Returns a handle on the named collection.
    ///
    /// The collection itself is created lazily on first insert; handles to
    /// the same name share the same documents.
    pub fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            name: name.to_string(),
            store: self.store.clone(),
        }
    }

    /// The names of every collection holding at least one document.
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let store = read(&self.store)?;
        Ok(store.keys().cloned().collect())
    }
}

/// A handle on one named collection inside a [`MemoryStore`].
#[derive(Clone, Debug)]
pub struct MemoryCollection {
    name: String,
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryCollection {
    /// The name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn read(store: &Arc<RwLock<StoreMap>>) -> Result<std::sync::RwLockReadGuard<'_, StoreMap>> {
    store
        .read()
        .map_err(|_| Error::Backend("storage lock poisoned".to_string()))
}

fn write(store: &Arc<RwLock<StoreMap>>) -> Result<std::sync::RwLockWriteGuard<'_, StoreMap>> {
    store
        .write()
        .map_err(|_| Error::Backend("storage lock poisoned".to_string()))
}

impl Collection for MemoryCollection {
    fn insert(&self, mut document: bson::Document) -> Result<ObjectId> {
        let id = match document.get("_id") {
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => {
                return Err(Error::Backend(format!(
                    "'_id' must be an ObjectId, got {other}"
                )));
            }
            None => {
                let id = ObjectId::new();
                document.insert("_id", id);
                id
            }
        };

        let mut store = write(&self.store)?;
        store.entry(self.name.clone()).or_default().push(document);
        log::trace!("inserted {id} into '{}'", self.name);
        Ok(id)
    }

    fn find_one(&self, filter: &Expr) -> Result<Option<bson::Document>> {
        let store = read(&self.store)?;
        let documents = match store.get(&self.name) {
            Some(documents) => documents,
            None => return Ok(None),
        };

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    fn find(&self, query: &Query) -> Result<Vec<bson::Document>> {
        let store = read(&self.store)?;
        let documents = match store.get(&self.name) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut matched = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(documents.iter(), filter)?,
            None => documents.clone(),
        };

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let left = a
                    .get(&sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = b
                    .get(&sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn update(&self, filter: &Expr, mut document: bson::Document, upsert: bool) -> Result<()> {
        let mut store = write(&self.store)?;
        let documents = store.entry(self.name.clone()).or_default();

        for stored in documents.iter_mut() {
            if DocumentEvaluator::new(stored).evaluate(filter)? {
                // The replacement keeps the stored identity unless it
                // carries its own.
                if !document.contains_key("_id") {
                    if let Some(id) = stored.get("_id") {
                        document.insert("_id", id.clone());
                    }
                }
                *stored = document;
                return Ok(());
            }
        }

        if upsert {
            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            documents.push(document);
        }
        Ok(())
    }

    fn remove(&self, filter: &Expr) -> Result<()> {
        let mut store = write(&self.store)?;
        let documents = match store.get_mut(&self.name) {
            Some(documents) => documents,
            None => return Ok(()),
        };

        let mut failure = None;
        documents.retain(|document| {
            match DocumentEvaluator::new(document).evaluate(filter) {
                Ok(matches) => !matches,
                Err(err) => {
                    failure.get_or_insert(err);
                    true
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbag_core::query::FieldOp;

    fn eq(field: &str, value: impl Into<Bson>) -> Expr {
        Expr::field(field.to_string(), FieldOp::Eq, value.into())
    }

    #[test]
    fn insert_assigns_an_identity_when_missing() {
        let store = MemoryStore::new();
        let users = store.collection("users");

        let id = users.insert(doc! { "name": "Alice" }).unwrap();
        let found = users.find_one(&eq("name", "Alice")).unwrap().unwrap();
        assert_eq!(found.get_object_id("_id").unwrap(), id);

        let explicit = ObjectId::new();
        let id = users
            .insert(doc! { "_id": explicit, "name": "Bob" })
            .unwrap();
        assert_eq!(id, explicit);
    }

    #[test]
    fn handles_share_the_same_documents() {
        let store = MemoryStore::new();
        store
            .collection("users")
            .insert(doc! { "name": "Alice" })
            .unwrap();
        let other = store.clone().collection("users");
        assert!(other.find_one(&eq("name", "Alice")).unwrap().is_some());
    }

    #[test]
    fn find_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        let users = store.collection("users");
        for (name, age) in [("Alice", 30), ("Bob", 25), ("Carol", 35), ("Dave", 19)] {
            users.insert(doc! { "name": name, "age": age }).unwrap();
        }

        let adults = Expr::field("age".to_string(), FieldOp::Gte, 21.into());
        let query = Query::builder()
            .filter(adults.clone())
            .sort("age", SortDirection::Desc)
            .build();
        let found = users.find(&query).unwrap();
        let names: Vec<&str> = found.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["Carol", "Alice", "Bob"]);

        let query = Query::builder()
            .filter(adults)
            .sort("age", SortDirection::Asc)
            .offset(1)
            .limit(1)
            .build();
        let found = users.find(&query).unwrap();
        assert_eq!(found[0].get_str("name").unwrap(), "Alice");
    }

    #[test]
    fn unfiltered_find_returns_insertion_order() {
        let store = MemoryStore::new();
        let users = store.collection("users");
        for name in ["a", "b", "c"] {
            users.insert(doc! { "name": name }).unwrap();
        }
        let found = users.find(&Query::new()).unwrap();
        let names: Vec<&str> = found.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_replaces_and_preserves_identity() {
        let store = MemoryStore::new();
        let users = store.collection("users");
        let id = users.insert(doc! { "name": "Alice", "age": 30 }).unwrap();

        users
            .update(&eq("name", "Alice"), doc! { "name": "Alicia" }, false)
            .unwrap();
        let found = users.find_one(&eq("name", "Alicia")).unwrap().unwrap();
        assert_eq!(found.get_object_id("_id").unwrap(), id);
        // The replacement is whole-document.
        assert!(!found.contains_key("age"));
    }

    #[test]
    fn update_without_match_is_a_no_op_unless_upserting() {
        let store = MemoryStore::new();
        let users = store.collection("users");

        users
            .update(&eq("name", "Ghost"), doc! { "name": "Ghost" }, false)
            .unwrap();
        assert!(users.find_one(&eq("name", "Ghost")).unwrap().is_none());

        users
            .update(&eq("name", "Ghost"), doc! { "name": "Ghost" }, true)
            .unwrap();
        let found = users.find_one(&eq("name", "Ghost")).unwrap().unwrap();
        assert!(found.get_object_id("_id").is_ok());
    }

    #[test]
    fn remove_deletes_every_match() {
        let store = MemoryStore::new();
        let users = store.collection("users");
        users.insert(doc! { "name": "Alice", "role": "admin" }).unwrap();
        users.insert(doc! { "name": "Bob", "role": "admin" }).unwrap();
        users.insert(doc! { "name": "Carol", "role": "user" }).unwrap();

        users.remove(&eq("role", "admin")).unwrap();
        let remaining = users.find(&Query::new()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].get_str("name").unwrap(), "Carol");
    }
}
