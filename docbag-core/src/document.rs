//! Document type declarations and the type-registration builder.
//!
//! A [`DocumentType`] is the engine's unit of schema: a named type with a
//! field [`Registry`], an optional collection name, and a position in an
//! inheritance lattice tracked by the [`Catalog`](crate::catalog::Catalog).
//!
//! Types are declared once, at startup, through the explicit registration
//! step [`TypeBuilder::register`] — the composition-based equivalent of
//! metaclass interception: base registries are embedded and overlaid rather
//! than discovered at runtime.
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! let mut catalog = Catalog::new();
//! let account = DocumentType::builder("Account")
//!     .field("name", Field::string())
//!     .field("surname", Field::string().optional())
//!     .register(&mut catalog)?;
//!
//! assert_eq!(account.collection(), Some("account"));
//! assert!(account.registry().contains("_id"));
//! # Ok::<(), docbag::error::Error>(())
//! ```

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::query::QueryField;
use crate::registry::Registry;

/// A declared document type: name, collection, inheritance links and the
/// field registry built for it.
///
/// Instances of this struct are immutable once registered; schema changes
/// go through [`Catalog::add_field`](crate::catalog::Catalog::add_field),
/// which installs rebuilt types.
#[derive(Clone, Debug)]
pub struct DocumentType {
    name: String,
    collection: Option<String>,
    abstract_: bool,
    bases: Vec<String>,
    ancestors: Vec<String>,
    registry: Registry,
}

impl DocumentType {
    /// Starts a builder for a new document type declaration.
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    /// The declared type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The collection this type persists into; `None` for abstract types
    /// that neither declare nor inherit one.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Whether this is an abstract (non-persistent) type.
    pub fn is_abstract(&self) -> bool {
        self.abstract_
    }

    /// Direct base type names, in declaration order.
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Transitive base type names, nearest first.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Whether this type is the named type or descends from it.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.name == type_name || self.ancestors.iter().any(|a| a == type_name)
    }

    /// The field registry built for this type.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Returns the type-level query-expression accessor for a declared
    /// field.
    ///
    /// This is deliberately separate from [`DocumentType::registry`]: one
    /// name never serves both the validation role and the query role.
    ///
    /// # Errors
    ///
    /// [`Error::Attribute`] when no field of that name is declared.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let criterion = account.query("name")?.eq("Alice");
    /// ```
    pub fn query(&self, field_name: &str) -> Result<QueryField> {
        if !self.registry.contains(field_name) {
            return Err(Error::Attribute(format!(
                "{}.{} is not defined",
                self.name, field_name
            )));
        }
        Ok(QueryField::new(field_name))
    }
}

/// Builder for declaring and registering a [`DocumentType`].
///
/// Fields are recorded in call order, which is the declaration order used
/// by the registry merge. `register` consumes the builder, wires the type
/// into the catalog and returns the shared type handle.
#[derive(Debug)]
pub struct TypeBuilder {
    name: String,
    collection: Option<String>,
    abstract_: bool,
    synthesize_id: bool,
    bases: Vec<String>,
    declared: Vec<(String, Field)>,
}

impl TypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: None,
            abstract_: false,
            synthesize_id: true,
            bases: Vec::new(),
            declared: Vec::new(),
        }
    }

    /// Adds a base type by name; repeatable, order-significant.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Declares a field on this type.
    ///
    /// Declaration order is preserved; a repeated name keeps the last
    /// declaration.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.declared.push((name.into(), field));
        self
    }

    /// Overrides the collection name (default: the lowercased type name,
    /// or the nearest base's collection when inherited).
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Marks the type abstract: a schema template with no collection and no
    /// identity requirement.
    pub fn abstract_document(mut self) -> Self {
        self.abstract_ = true;
        self
    }

    /// Suppresses the automatic `_id` injection.
    ///
    /// Non-abstract types must then declare or inherit an identity field
    /// themselves; registration fails otherwise.
    pub fn without_synthetic_id(mut self) -> Self {
        self.synthesize_id = false;
        self
    }

    /// Builds the registry, enforces the type invariants and publishes the
    /// type into the catalog.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when a base is unknown, the name is already
    /// registered, or a non-abstract type ends up without an `_id` field.
    pub fn register(self, catalog: &mut Catalog) -> Result<Arc<DocumentType>> {
        let bases: Vec<Arc<DocumentType>> = self
            .bases
            .iter()
            .map(|name| {
                catalog.get(name).ok_or_else(|| {
                    Error::Type(format!(
                        "unknown base type '{name}' for document type '{}'",
                        self.name
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let owning_bases = bases
            .iter()
            .filter(|base| base.collection.is_some())
            .count();
        if owning_bases > 1 {
            log::warn!(
                "multiple base types of '{}' define a collection; inheritance is ambiguous",
                self.name
            );
        }

        let mut ancestors = Vec::new();
        for base in &bases {
            for name in std::iter::once(base.name.as_str())
                .chain(base.ancestors.iter().map(String::as_str))
            {
                if !ancestors.iter().any(|a: &String| a == name) {
                    ancestors.push(name.to_string());
                }
            }
        }

        let base_registries: Vec<&Registry> =
            bases.iter().map(|base| base.registry()).collect();
        let mut registry = Registry::build(&base_registries, &self.declared);

        if !self.abstract_ && self.synthesize_id && !registry.contains("_id") {
            registry.add("_id", Field::object_id());
        }
        if !self.abstract_ && !registry.contains("_id") {
            return Err(Error::Type(format!(
                "non-abstract document type '{}' must have an _id field",
                self.name
            )));
        }

        let inherited_collection = bases
            .iter()
            .find_map(|base| base.collection.clone());
        let collection = match self.collection.or(inherited_collection) {
            Some(name) => Some(name),
            None if !self.abstract_ => Some(self.name.to_lowercase()),
            None => None,
        };

        let ty = DocumentType {
            name: self.name,
            collection,
            abstract_: self.abstract_,
            bases: self.bases,
            ancestors,
            registry,
        };

        catalog.install(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    #[test]
    fn register_injects_synthetic_id_and_collection_name() {
        let mut catalog = Catalog::new();
        let account = DocumentType::builder("Account")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();

        assert_eq!(account.collection(), Some("account"));
        let id = account.registry().get("_id").unwrap();
        assert_eq!(id.kind(), &FieldKind::ObjectId);
    }

    #[test]
    fn missing_identity_fails_at_registration_time() {
        let mut catalog = Catalog::new();
        let result = DocumentType::builder("Broken")
            .field("name", Field::string())
            .without_synthetic_id()
            .register(&mut catalog);
        assert!(matches!(result, Err(Error::Type(_))));
        assert!(!catalog.contains("Broken"));
    }

    #[test]
    fn abstract_types_need_no_identity_or_collection() {
        let mut catalog = Catalog::new();
        let base = DocumentType::builder("Base")
            .abstract_document()
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();

        assert!(base.is_abstract());
        assert_eq!(base.collection(), None);
        assert!(!base.registry().contains("_id"));
    }

    #[test]
    fn subtypes_inherit_fields_without_aliasing() {
        let mut catalog = Catalog::new();
        DocumentType::builder("Base")
            .abstract_document()
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();
        let sub = DocumentType::builder("Sub")
            .extends("Base")
            .field("extra", Field::integer().optional())
            .register(&mut catalog)
            .unwrap();

        assert!(sub.registry().contains("name"));
        assert!(sub.registry().contains("extra"));
        assert!(sub.registry().contains("_id"));
        assert!(sub.is_a("Base"));

        // The base registry is unchanged by the subtype declaration.
        let base = catalog.get("Base").unwrap();
        assert!(!base.registry().contains("extra"));
    }

    #[test]
    fn collection_name_is_inherited_from_the_nearest_base() {
        let mut catalog = Catalog::new();
        DocumentType::builder("Account")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();
        let admin = DocumentType::builder("Admin")
            .extends("Account")
            .register(&mut catalog)
            .unwrap();

        assert_eq!(admin.collection(), Some("account"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut catalog = Catalog::new();
        DocumentType::builder("Account")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();
        let result = DocumentType::builder("Account").register(&mut catalog);
        assert!(matches!(result, Err(Error::Type(_))));
    }

    #[test]
    fn unknown_base_is_rejected() {
        let mut catalog = Catalog::new();
        let result = DocumentType::builder("Sub")
            .extends("Missing")
            .register(&mut catalog);
        assert!(matches!(result, Err(Error::Type(_))));
    }

    #[test]
    fn query_accessor_exposes_declared_fields_only() {
        let mut catalog = Catalog::new();
        let account = DocumentType::builder("Account")
            .field("name", Field::string())
            .register(&mut catalog)
            .unwrap();

        assert!(account.query("name").is_ok());
        assert!(account.query("_id").is_ok());
        assert!(matches!(account.query("nope"), Err(Error::Attribute(_))));
    }
}
