//! Document instances: schema-validated value containers.
//!
//! An [`Instance`] is the runtime representation of a document: a shared
//! handle to its [`DocumentType`](crate::document::DocumentType) plus one
//! owned values map. Every write routes through the declared field's
//! validation, so an instance can never hold a value its schema rejected.
//!
//! # Example
//!
//! ```ignore
//! use docbag::prelude::*;
//!
//! let account = catalog.get("Account").unwrap();
//! let mut doc = Instance::new(&account, &catalog, Values::new()
//!     .with("name", "Alice")
//!     .with("surname", "Doe"))?;
//!
//! doc.set(&catalog, "surname", "Smith")?;
//! let wire = doc.serialize();
//! assert_eq!(wire.get_str("surname").unwrap(), "Smith");
//! # Ok::<(), docbag::error::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bson::oid::ObjectId;
use bson::Bson;

use crate::catalog::Catalog;
use crate::document::DocumentType;
use crate::error::{Error, Result};
use crate::field::FieldKind;

/// A single field slot value: a scalar wire value, an embedded document, or
/// a list of embedded documents.
#[derive(Clone, Debug)]
pub enum Value {
    /// A scalar value in canonical wire form.
    Scalar(Bson),
    /// A single embedded document instance.
    Embedded(Instance),
    /// An ordered list of embedded document instances.
    List(DocumentList),
}

impl From<Bson> for Value {
    fn from(value: Bson) -> Self {
        Value::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Bson::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(Bson::String(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(Bson::Int64(i64::from(value)))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Bson::Int64(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Bson::Double(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Bson::Boolean(value))
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::Scalar(Bson::ObjectId(value))
    }
}

impl From<bson::DateTime> for Value {
    fn from(value: bson::DateTime) -> Self {
        Value::Scalar(Bson::DateTime(value))
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Embedded(value)
    }
}

impl From<DocumentList> for Value {
    fn from(value: DocumentList) -> Self {
        Value::List(value)
    }
}

impl From<Vec<Instance>> for Value {
    fn from(items: Vec<Instance>) -> Self {
        Value::List(DocumentList::unbound(items))
    }
}

/// Keyword-style construction arguments for [`Instance::new`].
///
/// # Example
///
/// ```ignore
/// let values = Values::new()
///     .with("name", "Alice")
///     .with("age", 30);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Values(BTreeMap<String, Value>);

impl Values {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument, replacing any previous one of the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Inserts an argument in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Whether an argument of this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Looks up an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// An ordered, mutable sequence of embedded documents bound to an element
/// type.
///
/// Every element is validated against the bound element type (or any of its
/// registered subtypes) on the way in; a list built from a plain `Vec` with
/// one non-conforming element is rejected wholesale.
#[derive(Clone, Debug, Default)]
pub struct DocumentList {
    element_type: Option<String>,
    items: Vec<Instance>,
}

impl DocumentList {
    /// Creates a list bound to `element_type`, validating every element.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when any element is not an instance of the element
    /// type; no partial insertion happens.
    pub fn new(element_type: &str, items: Vec<Instance>) -> Result<Self> {
        for item in &items {
            Self::check(element_type, item)?;
        }
        Ok(Self {
            element_type: Some(element_type.to_string()),
            items,
        })
    }

    /// Creates an unbound list; elements are validated once the list is
    /// assigned to an embedded-list field.
    pub(crate) fn unbound(items: Vec<Instance>) -> Self {
        Self { element_type: None, items }
    }

    /// Validates every element against `element_type` and binds the list.
    pub(crate) fn bind(self, element_type: &str) -> Result<Self> {
        Self::new(element_type, self.items)
    }

    fn check(element_type: &str, item: &Instance) -> Result<()> {
        if !item.is_a(element_type) {
            return Err(Error::Type(format!(
                "object of type '{}' must be an instance of '{}'",
                item.type_name(),
                element_type
            )));
        }
        Ok(())
    }

    /// The element type this list is bound to.
    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    /// Appends an element after validating it.
    pub fn push(&mut self, item: Instance) -> Result<()> {
        if let Some(element_type) = &self.element_type {
            Self::check(element_type, &item)?;
        }
        self.items.push(item);
        Ok(())
    }

    /// Inserts an element at `index` after validating it.
    pub fn insert(&mut self, index: usize, item: Instance) -> Result<()> {
        if let Some(element_type) = &self.element_type {
            Self::check(element_type, &item)?;
        }
        self.items.insert(index, item);
        Ok(())
    }

    /// Appends every element after validating all of them; nothing is
    /// inserted when any element fails.
    pub fn extend(&mut self, items: Vec<Instance>) -> Result<()> {
        if let Some(element_type) = &self.element_type {
            for item in &items {
                Self::check(element_type, item)?;
            }
        }
        self.items.extend(items);
        Ok(())
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an element by position.
    pub fn get(&self, index: usize) -> Option<&Instance> {
        self.items.get(index)
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.iter()
    }
}

impl std::ops::Index<usize> for DocumentList {
    type Output = Instance;

    fn index(&self, index: usize) -> &Instance {
        &self.items[index]
    }
}

/// A document instance: one owned values map routed through its type's
/// schema.
#[derive(Clone)]
pub struct Instance {
    ty: Arc<DocumentType>,
    values: BTreeMap<String, Value>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("values", &self.values)
            .finish()
    }
}

impl Instance {
    /// Constructs an instance from keyword-style arguments, validating every
    /// supplied value against the type's schema.
    ///
    /// Declared fields absent from `values` resolve their `missing` policy;
    /// leftover keys are a [`Error::Type`] naming the offending arguments.
    /// Validation failures during construction surface as [`Error::Type`]
    /// rather than the attribute errors raised by later mutation.
    pub fn new(ty: &Arc<DocumentType>, catalog: &Catalog, values: Values) -> Result<Self> {
        if ty.is_abstract() {
            return Err(Error::Type(format!(
                "cannot construct abstract type '{}'",
                ty.name()
            )));
        }
        let mut supplied = values.into_map();
        let mut instance = Instance {
            ty: ty.clone(),
            values: BTreeMap::new(),
        };

        let names: Vec<String> = ty.registry().names().map(str::to_string).collect();
        for name in names {
            let value = supplied.remove(&name);
            instance
                .assign(catalog, &name, value)
                .map_err(Error::into_type_error)?;
        }

        if !supplied.is_empty() {
            let unknown: Vec<&str> = supplied.keys().map(String::as_str).collect();
            return Err(Error::Type(format!(
                "unknown arguments for {}: {}",
                ty.name(),
                unknown.join(", ")
            )));
        }

        Ok(instance)
    }

    /// The declared type of this instance.
    pub fn document_type(&self) -> &Arc<DocumentType> {
        &self.ty
    }

    /// The declared type name.
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Whether this instance's type is the named type or descends from it.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.ty.is_a(type_name)
    }

    /// The identity value, when one is set.
    pub fn id(&self) -> Option<ObjectId> {
        match self.values.get("_id") {
            Some(Value::Scalar(Bson::ObjectId(oid))) => Some(*oid),
            _ => None,
        }
    }

    /// Reads a field's current value; `None` when the slot is unset.
    ///
    /// # Errors
    ///
    /// [`Error::Attribute`] when no field of that name is declared.
    pub fn get(&self, name: &str) -> Result<Option<&Value>> {
        if !self.ty.registry().contains(name) {
            return Err(self.undefined(name));
        }
        Ok(self.values.get(name))
    }

    /// Writes a field, re-validating the value through the declared field.
    ///
    /// Scalar fields coerce and validate; embedded-document fields accept an
    /// instance of the declared type (or a registered subtype) or null;
    /// embedded-list fields accept a [`DocumentList`] or plain `Vec` of the
    /// right element type. Anything else is an [`Error::Attribute`].
    pub fn set(&mut self, catalog: &Catalog, name: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(catalog, name, Some(value.into()))
    }

    /// Clears a field, resolving its `missing` policy.
    ///
    /// Scalar and embedded slots become unset (or take the policy's
    /// substitute); an embedded-list slot becomes an empty list.
    pub fn unset(&mut self, catalog: &Catalog, name: &str) -> Result<()> {
        let field = self
            .ty
            .registry()
            .get(name)
            .ok_or_else(|| self.undefined(name))?;
        if let FieldKind::EmbeddedList(element_type) = field.kind() {
            let empty = DocumentList::new(element_type, Vec::new())?;
            self.values.insert(name.to_string(), Value::List(empty));
            return Ok(());
        }
        self.assign(catalog, name, None)
    }

    /// Routes a write through the declared field's validation.
    fn assign(&mut self, catalog: &Catalog, name: &str, value: Option<Value>) -> Result<()> {
        let field = self
            .ty
            .registry()
            .get(name)
            .ok_or_else(|| self.undefined(name))?
            .clone();

        match field.kind() {
            FieldKind::Embedded(type_name) => match value {
                Some(Value::Embedded(instance)) => {
                    if !instance.is_a(type_name) {
                        return Err(Error::Attribute(format!(
                            "cannot set {}.{} to an instance of '{}': expected '{}'",
                            self.ty.name(),
                            name,
                            instance.type_name(),
                            type_name
                        )));
                    }
                    self.store(name, Some(Value::Embedded(instance)));
                    Ok(())
                }
                None | Some(Value::Scalar(Bson::Null)) => {
                    let resolved = field
                        .deserialize(catalog, None)
                        .map_err(Error::into_attribute_error)?;
                    self.store(name, resolved);
                    Ok(())
                }
                Some(_) => Err(Error::Attribute(format!(
                    "cannot set {}.{}: value is not a '{}' instance",
                    self.ty.name(),
                    name,
                    type_name
                ))),
            },
            FieldKind::EmbeddedList(type_name) => match value {
                Some(Value::List(list)) => {
                    let bound = list
                        .bind(type_name)
                        .map_err(Error::into_attribute_error)?;
                    self.store(name, Some(Value::List(bound)));
                    Ok(())
                }
                None | Some(Value::Scalar(Bson::Null)) => {
                    let resolved = field
                        .deserialize(catalog, None)
                        .map_err(Error::into_attribute_error)?;
                    self.store(name, resolved);
                    Ok(())
                }
                Some(_) => Err(Error::Attribute(format!(
                    "cannot set {}.{}: value is not a list of '{}' instances",
                    self.ty.name(),
                    name,
                    type_name
                ))),
            },
            _ => match value {
                None | Some(Value::Scalar(_)) => {
                    let input = match &value {
                        Some(Value::Scalar(bson)) => Some(bson.clone()),
                        _ => None,
                    };
                    let resolved = field
                        .deserialize(catalog, input.as_ref())
                        .map_err(Error::into_attribute_error)?;
                    self.store(name, resolved);
                    Ok(())
                }
                Some(_) => Err(Error::Attribute(format!(
                    "cannot set {}.{}: expected a scalar value",
                    self.ty.name(),
                    name
                ))),
            },
        }
    }

    fn store(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.values.insert(name.to_string(), value);
            }
            None => {
                self.values.remove(name);
            }
        }
    }

    fn undefined(&self, name: &str) -> Error {
        Error::Attribute(format!("{}.{} is not defined", self.ty.name(), name))
    }

    /// Emits the sparse wire mapping: one entry per set field, embedded
    /// documents serialized without their own identity.
    pub fn serialize(&self) -> bson::Document {
        let mut doc = bson::Document::new();
        for (name, value) in &self.values {
            let bson = match value {
                Value::Scalar(bson) => bson.clone(),
                Value::Embedded(instance) => Bson::Document(instance.serialize_embedded()),
                Value::List(list) => Bson::Array(
                    list.iter()
                        .map(|item| Bson::Document(item.serialize_embedded()))
                        .collect(),
                ),
            };
            doc.insert(name.clone(), bson);
        }
        doc
    }

    /// The embedded wire form: the full serialization minus the identity
    /// field, which never travels inside a parent document.
    pub(crate) fn serialize_embedded(&self) -> bson::Document {
        let mut doc = self.serialize();
        doc.remove("_id");
        doc
    }
}

impl PartialEq for Instance {
    /// Identity comparison when both sides carry an identity, full
    /// serialization comparison otherwise.
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(left), Some(right)) => left == right,
            _ => self.serialize() == other.serialize(),
        }
    }
}
