//! The catalog: the process-wide registry of document types.
//!
//! Every [`DocumentType`] is installed here under its unique name, together
//! with the inheritance edges that drive:
//!
//! - Name resolution for bases, embedded fields, and global references.
//! - Schema propagation: [`Catalog::add_field`] copies a new field into a
//!   type and every registered descendant.
//! - Polymorphic deserialization: [`Catalog::deserialize`] revives a wire
//!   mapping as whichever type in the named hierarchy its keys best fit.
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! let mut catalog = Catalog::new();
//! DocumentType::builder("Account")
//!     .field("name", Field::string())
//!     .register(&mut catalog)?;
//!
//! let doc = catalog.deserialize("Account", bson::doc! { "name": "Alice" })?;
//! assert_eq!(doc.type_name(), "Account");
//! # Ok::<(), docbag::error::Error>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bson::Bson;

use crate::document::DocumentType;
use crate::error::{Error, Result};
use crate::field::{Field, FieldKind};
use crate::instance::{DocumentList, Instance, Value, Values};

/// The registry of document types and their inheritance edges.
#[derive(Debug, Default)]
pub struct Catalog {
    types: HashMap<String, Arc<DocumentType>>,
    children: HashMap<String, Vec<String>>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a registered type by name.
    pub fn get(&self, name: &str) -> Option<Arc<DocumentType>> {
        self.types.get(name).cloned()
    }

    /// Whether a type of this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// The number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Installs a finished type, recording its inheritance edges.
    pub(crate) fn install(&mut self, ty: DocumentType) -> Result<Arc<DocumentType>> {
        if self.types.contains_key(ty.name()) {
            return Err(Error::Type(format!(
                "a document type named '{}' is already registered",
                ty.name()
            )));
        }
        for base in ty.bases() {
            self.children
                .entry(base.clone())
                .or_default()
                .push(ty.name().to_string());
        }
        log::debug!(
            "registered document type '{}' (collection: {:?})",
            ty.name(),
            ty.collection()
        );
        let ty = Arc::new(ty);
        self.types.insert(ty.name().to_string(), ty.clone());
        Ok(ty)
    }

    /// The names of every type registered below `type_name`, transitively.
    pub fn descendants(&self, type_name: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut stack: Vec<&str> = vec![type_name];
        while let Some(current) = stack.pop() {
            if let Some(kids) = self.children.get(current) {
                for kid in kids {
                    if !found.contains(kid) {
                        found.push(kid.clone());
                        stack.push(kid.as_str());
                    }
                }
            }
        }
        found
    }

    /// Whether `concrete` names the declared type or a type registered
    /// below it.
    pub fn is_instance_of(&self, concrete: &str, declared: &str) -> bool {
        self.get(concrete).is_some_and(|ty| ty.is_a(declared))
    }

    /// Adds a field to a registered type and every registered descendant.
    ///
    /// Each target receives its own copy of the field, so later per-type
    /// customization cannot alias across the hierarchy. Instances created
    /// before the call keep their original schema; only instances created
    /// afterwards see the new field.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when no type of that name is registered.
    pub fn add_field(&mut self, type_name: &str, field_name: &str, field: Field) -> Result<()> {
        if !self.types.contains_key(type_name) {
            return Err(Error::Type(format!(
                "unknown document type '{type_name}'"
            )));
        }
        let mut targets = vec![type_name.to_string()];
        targets.extend(self.descendants(type_name));
        for target in targets {
            if let Some(existing) = self.types.get(&target) {
                let mut ty = (**existing).clone();
                ty.registry_mut().add(field_name, field.clone_unbound());
                self.types.insert(target, Arc::new(ty));
            }
        }
        Ok(())
    }

    /// Revives a wire mapping as an instance of the named type or one of its
    /// registered concrete descendants.
    ///
    /// Every candidate attempts construction from the mapping; of the ones
    /// that validate, those declaring the most supplied keys are kept. The
    /// result must be unambiguous.
    ///
    /// # Errors
    ///
    /// - [`Error::Type`] when the type name is unknown.
    /// - [`Error::Type`] when no candidate accepts the mapping, or more than
    ///   one does at the same score.
    pub fn deserialize(&self, type_name: &str, doc: bson::Document) -> Result<Instance> {
        let named = self.get(type_name).ok_or_else(|| {
            Error::Type(format!("unknown document type '{type_name}'"))
        })?;

        let mut candidates = vec![named];
        for descendant in self.descendants(type_name) {
            if let Some(ty) = self.get(&descendant) {
                if !ty.is_abstract() {
                    candidates.push(ty);
                }
            }
        }

        let mut matched: Vec<Instance> = Vec::new();
        let mut best_score: Option<usize> = None;
        for ty in &candidates {
            let (score, instance) = match self.revive(ty, &doc) {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::trace!("'{}' rejected the mapping: {err}", ty.name());
                    continue;
                }
            };
            match best_score {
                Some(best) if score < best => {}
                Some(best) if score == best => matched.push(instance),
                _ => {
                    best_score = Some(score);
                    matched = vec![instance];
                }
            }
        }

        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        match matched.len() {
            0 => Err(Error::Type(format!(
                "no candidates found for '{}' with keys: {}",
                type_name,
                keys.join(", ")
            ))),
            1 => Ok(matched.remove(0)),
            _ => Err(Error::Type(format!(
                "too many candidates found for '{}' with keys: {}",
                type_name,
                keys.join(", ")
            ))),
        }
    }

    /// Attempts construction of one candidate from the wire mapping.
    ///
    /// Embedded entries are recursively revived against the candidate's own
    /// registry before construction; the score counts the supplied keys the
    /// candidate declares.
    fn revive(&self, ty: &Arc<DocumentType>, doc: &bson::Document) -> Result<(usize, Instance)> {
        let mut values = Values::new();
        let mut score = 0usize;
        for (key, raw) in doc.iter() {
            let field = match ty.registry().get(key) {
                Some(field) => field,
                None => {
                    // Unknown key: pass through so construction reports it.
                    values.insert(key.clone(), Value::Scalar(raw.clone()));
                    continue;
                }
            };
            score += 1;
            match field.kind() {
                FieldKind::Embedded(inner) => match raw {
                    Bson::Null => {}
                    Bson::Document(mapping) => {
                        let instance = self.deserialize(inner, mapping.clone())?;
                        values.insert(key.clone(), Value::Embedded(instance));
                    }
                    other => {
                        return Err(Error::Type(format!(
                            "'{key}' expects a mapping, got {other}"
                        )));
                    }
                },
                FieldKind::EmbeddedList(inner) => match raw {
                    Bson::Null => {}
                    Bson::Array(items) => {
                        let mut instances = Vec::with_capacity(items.len());
                        for item in items {
                            match item {
                                Bson::Document(mapping) => {
                                    instances.push(self.deserialize(inner, mapping.clone())?);
                                }
                                other => {
                                    return Err(Error::Type(format!(
                                        "'{key}' expects mapping elements, got {other}"
                                    )));
                                }
                            }
                        }
                        let list = DocumentList::new(inner, instances)?;
                        values.insert(key.clone(), Value::List(list));
                    }
                    other => {
                        return Err(Error::Type(format!(
                            "'{key}' expects a list, got {other}"
                        )));
                    }
                },
                _ => values.insert(key.clone(), Value::Scalar(raw.clone())),
            }
        }
        let instance = Instance::new(ty, self, values)?;
        Ok((score, instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn hierarchy() -> Catalog {
        let mut catalog = Catalog::new();
        DocumentType::builder("Base")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();
        DocumentType::builder("Special")
            .extends("Base")
            .field("level", Field::integer())
            .register(&mut catalog)
            .unwrap();
        DocumentType::builder("VerySpecial")
            .extends("Special")
            .field("grade", Field::string())
            .register(&mut catalog)
            .unwrap();
        catalog
    }

    #[test]
    fn descendants_are_transitive() {
        let catalog = hierarchy();
        let mut names = catalog.descendants("Base");
        names.sort();
        assert_eq!(names, vec!["Special", "VerySpecial"]);
        assert!(catalog.descendants("VerySpecial").is_empty());

        assert!(catalog.is_instance_of("VerySpecial", "Base"));
        assert!(!catalog.is_instance_of("Base", "Special"));
        assert!(!catalog.is_instance_of("Ghost", "Base"));
    }

    #[test]
    fn deserialize_picks_the_declaring_type() {
        let catalog = hierarchy();

        let doc = catalog
            .deserialize("Base", doc! { "name": "plain" })
            .unwrap();
        assert_eq!(doc.type_name(), "Base");

        let doc = catalog
            .deserialize("Base", doc! { "name": "ranked", "level": 3 })
            .unwrap();
        assert_eq!(doc.type_name(), "Special");

        let doc = catalog
            .deserialize(
                "Base",
                doc! { "name": "top", "level": 3, "grade": "A" },
            )
            .unwrap();
        assert_eq!(doc.type_name(), "VerySpecial");
    }

    #[test]
    fn deserialize_reports_no_candidates() {
        let catalog = hierarchy();
        let err = catalog
            .deserialize("Base", doc! { "name": "x", "mystery": 1 })
            .unwrap_err();
        match err {
            Error::Type(msg) => {
                assert!(msg.contains("no candidates"), "{msg}");
                assert!(msg.contains("mystery"), "{msg}");
            }
            other => panic!("expected Type error, got {other}"),
        }
    }

    #[test]
    fn deserialize_reports_ambiguity() {
        let mut catalog = hierarchy();
        // A sibling of Special that declares the same shape.
        DocumentType::builder("Parallel")
            .extends("Base")
            .field("level", Field::integer())
            .register(&mut catalog)
            .unwrap();

        let err = catalog
            .deserialize("Base", doc! { "name": "x", "level": 1 })
            .unwrap_err();
        match err {
            Error::Type(msg) => assert!(msg.contains("too many candidates"), "{msg}"),
            other => panic!("expected Type error, got {other}"),
        }
    }

    #[test]
    fn deserialize_skips_abstract_descendants() {
        let mut catalog = Catalog::new();
        DocumentType::builder("Root")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();
        DocumentType::builder("Middle")
            .extends("Root")
            .abstract_document()
            .field("level", Field::integer())
            .register(&mut catalog)
            .unwrap();
        DocumentType::builder("Leaf")
            .extends("Middle")
            .register(&mut catalog)
            .unwrap();

        let doc = catalog
            .deserialize("Root", doc! { "name": "x", "level": 2 })
            .unwrap();
        assert_eq!(doc.type_name(), "Leaf");
    }

    #[test]
    fn deserialize_revives_embedded_documents() {
        let mut catalog = hierarchy();
        DocumentType::builder("Main")
            .field("title", Field::string())
            .field("ed", Field::embedded("Base").optional())
            .field("edl", Field::embedded_list("Base").optional())
            .register(&mut catalog)
            .unwrap();

        let doc = catalog
            .deserialize(
                "Main",
                doc! {
                    "title": "t",
                    "ed": { "name": "inner", "level": 1 },
                    "edl": [ { "name": "a" }, { "name": "b", "level": 2, "grade": "B" } ],
                },
            )
            .unwrap();

        match doc.get("ed").unwrap() {
            Some(Value::Embedded(inner)) => assert_eq!(inner.type_name(), "Special"),
            other => panic!("expected embedded value, got {other:?}"),
        }
        match doc.get("edl").unwrap() {
            Some(Value::List(list)) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].type_name(), "Base");
                assert_eq!(list[1].type_name(), "VerySpecial");
            }
            other => panic!("expected list value, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_drops_null_embedded_entries() {
        let mut catalog = hierarchy();
        DocumentType::builder("Main")
            .field("title", Field::string())
            .field("ed", Field::embedded("Base").optional())
            .register(&mut catalog)
            .unwrap();

        let doc = catalog
            .deserialize("Main", doc! { "title": "t", "ed": Bson::Null })
            .unwrap();
        assert!(doc.get("ed").unwrap().is_none());
    }

    #[test]
    fn add_field_propagates_to_descendants() {
        let mut catalog = hierarchy();
        catalog
            .add_field("Base", "tag", Field::string().optional())
            .unwrap();

        for name in ["Base", "Special", "VerySpecial"] {
            let ty = catalog.get(name).unwrap();
            let field = ty.registry().get("tag").unwrap_or_else(|| {
                panic!("'{name}' did not receive the field");
            });
            assert_eq!(field.name(), "tag");
        }

        // Each copy is independent of the others.
        let base = catalog.get("Base").unwrap();
        let special = catalog.get("Special").unwrap();
        assert!(!Arc::ptr_eq(&base, &special));
    }

    #[test]
    fn add_field_requires_a_known_type() {
        let mut catalog = Catalog::new();
        let err = catalog
            .add_field("Ghost", "tag", Field::string())
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }
}
