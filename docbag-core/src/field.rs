//! Typed field schema nodes and their validation pipeline.
//!
//! A [`Field`] is the leaf of the document schema: it knows how to coerce a
//! wire value into its native form ([`Field::deserialize`]), how to emit the
//! wire form back ([`Field::serialize`]), and what to substitute when a value
//! is absent (the [`Policy`] pair `default`/`missing`).
//!
//! # Field Construction
//!
//! Fields are built with kind-specific constructors and configured through
//! chainable methods:
//!
//! ```ignore
//! use docbag::field::Field;
//!
//! let name = Field::string();
//! let age = Field::integer().optional();
//! let status = Field::string()
//!     .missing_value("pending")
//!     .validate(|field, value| match value.as_str() {
//!         Some("pending" | "active" | "closed") => Ok(()),
//!         _ => Err(format!("unknown status for {field}")),
//!     });
//! ```
//!
//! # Absence
//!
//! The wire format has no dedicated absence marker, so the engine models an
//! absent value as `None` on the way in and `None` on the way out. A present
//! `Bson::Null` is treated the same as absence; both resolve through the
//! field's `missing` policy on deserialize and its `default` policy on
//! serialize.

use std::fmt;
use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Bson, Decimal128};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::instance::{DocumentList, Value};

/// Zero-argument producer used by [`Policy::Produce`].
pub type Producer = Arc<dyn Fn() -> Bson + Send + Sync>;

/// Normalizer applied to a coerced value before validation.
pub type Preparer = Arc<dyn Fn(Bson) -> Bson + Send + Sync>;

/// Custom predicate applied to a coerced value; returns a reason on failure.
pub type Validator = Arc<dyn Fn(&str, &Bson) -> std::result::Result<(), String> + Send + Sync>;

/// Substitution policy for an absent value.
///
/// A field carries two of these: `default`, consulted by [`Field::serialize`],
/// and `missing`, consulted by [`Field::deserialize`].
#[derive(Clone)]
pub enum Policy {
    /// Leave the slot unset.
    Absent,
    /// Absence is an error ([`Error::Invalid`] with reason "required").
    Required,
    /// Substitute a constant value.
    Value(Bson),
    /// Substitute the output of a zero-argument producer.
    Produce(Producer),
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Absent => write!(f, "Absent"),
            Policy::Required => write!(f, "Required"),
            Policy::Value(v) => write!(f, "Value({v})"),
            Policy::Produce(_) => write!(f, "Produce(..)"),
        }
    }
}

/// The type of value a field holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// 64-bit integer (32-bit wire values widen, integral doubles convert).
    Integer,
    /// Boolean (the strings `"true"`, `"false"`, `"1"` and `"0"` coerce).
    Boolean,
    /// 64-bit float (integers widen, decimal strings parse).
    Float,
    /// 128-bit decimal.
    Decimal,
    /// Calendar date, canonical form `%Y-%m-%d`.
    Date,
    /// Point in time; RFC 3339 strings convert to the wire datetime type.
    DateTime,
    /// Time of day, canonical form `%H:%M:%S`.
    Time,
    /// 12-byte opaque identity value, textual form 24 lowercase hex chars.
    ObjectId,
    /// A dotted symbol name resolved against the catalog's registered types.
    GlobalRef,
    /// A single embedded document of the named type.
    Embedded(String),
    /// An ordered list of embedded documents of the named type.
    EmbeddedList(String),
}

/// A typed, named, validating leaf schema element.
///
/// A field is unbound (empty name) until it is added to a
/// [`Registry`](crate::registry::Registry), which assigns the name it was
/// declared under.
#[derive(Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    default: Policy,
    missing: Policy,
    preparer: Option<Preparer>,
    validator: Option<Validator>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

impl Field {
    fn new(kind: FieldKind, missing: Policy) -> Self {
        Self {
            name: String::new(),
            kind,
            default: Policy::Absent,
            missing,
            preparer: None,
            validator: None,
        }
    }

    /// Creates a string field. Required unless configured otherwise.
    pub fn string() -> Self {
        Self::new(FieldKind::String, Policy::Required)
    }

    /// Creates an integer field. Required unless configured otherwise.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer, Policy::Required)
    }

    /// Creates a boolean field. Required unless configured otherwise.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean, Policy::Required)
    }

    /// Creates a float field. Required unless configured otherwise.
    pub fn float() -> Self {
        Self::new(FieldKind::Float, Policy::Required)
    }

    /// Creates a decimal field. Required unless configured otherwise.
    pub fn decimal() -> Self {
        Self::new(FieldKind::Decimal, Policy::Required)
    }

    /// Creates a date field. Required unless configured otherwise.
    pub fn date() -> Self {
        Self::new(FieldKind::Date, Policy::Required)
    }

    /// Creates a datetime field. Required unless configured otherwise.
    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime, Policy::Required)
    }

    /// Creates a time field. Required unless configured otherwise.
    pub fn time() -> Self {
        Self::new(FieldKind::Time, Policy::Required)
    }

    /// Creates an identity field that stays unset while absent.
    ///
    /// This is the policy used for the synthetic `_id` field: the identity
    /// is bound by the storage collaborator on insert rather than being
    /// synthesized locally. Use [`Field::object_id_generated`] for the
    /// generate-on-deserialize behavior instead.
    pub fn object_id() -> Self {
        Self::new(FieldKind::ObjectId, Policy::Absent)
    }

    /// Creates an identity field that synthesizes a fresh identity when an
    /// absent value is deserialized.
    pub fn object_id_generated() -> Self {
        Self::new(
            FieldKind::ObjectId,
            Policy::Produce(Arc::new(|| Bson::ObjectId(ObjectId::new()))),
        )
    }

    /// Creates a global-reference field holding a dotted symbol name that
    /// must resolve to a registered document type.
    pub fn global_ref() -> Self {
        Self::new(FieldKind::GlobalRef, Policy::Required)
    }

    /// Creates an embedded-document field of the named type.
    pub fn embedded(type_name: impl Into<String>) -> Self {
        Self::new(FieldKind::Embedded(type_name.into()), Policy::Required)
    }

    /// Creates an embedded-list field whose elements are of the named type.
    pub fn embedded_list(type_name: impl Into<String>) -> Self {
        Self::new(FieldKind::EmbeddedList(type_name.into()), Policy::Required)
    }

    /// Marks an absent value as an error on deserialize (the stock policy
    /// for most kinds).
    pub fn required(mut self) -> Self {
        self.missing = Policy::Required;
        self
    }

    /// Leaves the slot unset when the value is absent on deserialize.
    pub fn optional(mut self) -> Self {
        self.missing = Policy::Absent;
        self
    }

    /// Substitutes a constant when the value is absent on deserialize.
    pub fn missing_value(mut self, value: impl Into<Bson>) -> Self {
        self.missing = Policy::Value(value.into());
        self
    }

    /// Substitutes a producer's output when the value is absent on
    /// deserialize.
    pub fn produce_missing(mut self, f: impl Fn() -> Bson + Send + Sync + 'static) -> Self {
        self.missing = Policy::Produce(Arc::new(f));
        self
    }

    /// Substitutes a constant when the value is absent on serialize.
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Policy::Value(value.into());
        self
    }

    /// Substitutes a producer's output when the value is absent on
    /// serialize.
    pub fn produce_default(mut self, f: impl Fn() -> Bson + Send + Sync + 'static) -> Self {
        self.default = Policy::Produce(Arc::new(f));
        self
    }

    /// Installs a normalizer run after coercion and before validation.
    pub fn prepare(mut self, f: impl Fn(Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.preparer = Some(Arc::new(f));
        self
    }

    /// Installs a custom validator run after coercion.
    pub fn validate(
        mut self,
        f: impl Fn(&str, &Bson) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    /// The name this field is bound to, empty until registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of value this field holds.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether this field has been bound to a name by a registry.
    pub fn is_bound(&self) -> bool {
        !self.name.is_empty()
    }

    /// Whether this field embeds a single document.
    pub fn is_embedded_doc(&self) -> bool {
        matches!(self.kind, FieldKind::Embedded(_))
    }

    /// Whether this field embeds a list of documents.
    pub fn is_embedded_list(&self) -> bool {
        matches!(self.kind, FieldKind::EmbeddedList(_))
    }

    /// The embedded type name for embedded-document and embedded-list
    /// fields, `None` for scalar kinds.
    pub fn embedded_type(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Embedded(name) | FieldKind::EmbeddedList(name) => Some(name),
            _ => None,
        }
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Produces an independent copy with the same configuration and an
    /// unbound name, for reuse across owner types without aliasing.
    pub fn clone_unbound(&self) -> Field {
        let mut cloned = self.clone();
        cloned.name = String::new();
        cloned
    }

    /// Deserializes a wire value into its native form.
    ///
    /// An absent input (`None` or `Bson::Null`) resolves the `missing`
    /// policy; otherwise the value runs through kind coercion, the optional
    /// preparer and the optional validator, in that order.
    ///
    /// Returns `Ok(None)` when the slot should stay unset.
    ///
    /// # Errors
    ///
    /// [`Error::Invalid`] when the value fails coercion or validation, or
    /// when the field is required and the input is absent.
    pub fn deserialize(&self, catalog: &Catalog, input: Option<&Bson>) -> Result<Option<Value>> {
        let present = match input {
            None | Some(Bson::Null) => None,
            Some(value) => Some(value),
        };

        let value = match present {
            Some(value) => value.clone(),
            None => {
                // Missing substitutions are returned untouched: the policy
                // value is trusted configuration, not caller input.
                match self.resolve_policy(&self.missing)? {
                    None | Some(Bson::Null) => return Ok(None),
                    Some(substitute) => return self.wrap(catalog, substitute).map(Some),
                }
            }
        };

        match &self.kind {
            FieldKind::Embedded(_) | FieldKind::EmbeddedList(_) => {
                self.wrap(catalog, value).map(Some)
            }
            _ => {
                let mut coerced = self.coerce(Some(catalog), &value)?;
                if let Some(preparer) = &self.preparer {
                    coerced = preparer(coerced);
                }
                if let Some(validator) = &self.validator {
                    validator(&self.name, &coerced)
                        .map_err(|reason| self.invalid(reason))?;
                }
                Ok(Some(Value::Scalar(coerced)))
            }
        }
    }

    /// Serializes a native value to its wire form.
    ///
    /// An absent input resolves the `default` policy. Serialization is
    /// idempotent for scalar kinds: serializing a deserialized value yields
    /// the same wire form.
    ///
    /// # Errors
    ///
    /// [`Error::Invalid`] when the value cannot be coerced to wire form.
    pub fn serialize(&self, input: Option<&Value>) -> Result<Option<Bson>> {
        let value = match input {
            Some(value) => value,
            None => {
                return match self.resolve_policy(&self.default)? {
                    None | Some(Bson::Null) => Ok(None),
                    Some(substitute) => self.coerce(None, &substitute).map(Some),
                };
            }
        };

        match value {
            Value::Scalar(bson) => self.coerce(None, bson).map(Some),
            Value::Embedded(instance) => Ok(Some(Bson::Document(instance.serialize_embedded()))),
            Value::List(list) => Ok(Some(Bson::Array(
                list.iter()
                    .map(|item| Bson::Document(item.serialize_embedded()))
                    .collect(),
            ))),
        }
    }

    /// Wraps a present wire value in the matching [`Value`] shape, resolving
    /// embedded documents and lists through the catalog.
    fn wrap(&self, catalog: &Catalog, value: Bson) -> Result<Value> {
        match &self.kind {
            FieldKind::Embedded(type_name) => match value {
                Bson::Document(doc) => catalog
                    .deserialize(type_name, doc)
                    .map(Value::Embedded)
                    .map_err(|e| self.invalid(e.to_string())),
                other => Err(self.invalid(format!("expected a mapping, got {other}"))),
            },
            FieldKind::EmbeddedList(type_name) => match value {
                Bson::Array(items) => {
                    let mut instances = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Bson::Document(doc) => instances.push(
                                catalog
                                    .deserialize(type_name, doc)
                                    .map_err(|e| self.invalid(e.to_string()))?,
                            ),
                            other => {
                                return Err(
                                    self.invalid(format!("expected a mapping element, got {other}"))
                                );
                            }
                        }
                    }
                    DocumentList::new(type_name, instances)
                        .map(Value::List)
                        .map_err(|e| self.invalid(e.to_string()))
                }
                other => Err(self.invalid(format!("expected a list, got {other}"))),
            },
            _ => self.coerce(None, &value).map(Value::Scalar),
        }
    }

    fn resolve_policy(&self, policy: &Policy) -> Result<Option<Bson>> {
        match policy {
            Policy::Absent => Ok(None),
            Policy::Required => Err(self.invalid("required")),
            Policy::Value(value) => Ok(Some(value.clone())),
            Policy::Produce(producer) => Ok(Some(producer())),
        }
    }

    /// Kind-specific coercion between wire and native forms.
    ///
    /// The catalog is only consulted for global references; it is absent on
    /// the serialize path, where the stored name has already been resolved.
    fn coerce(&self, catalog: Option<&Catalog>, value: &Bson) -> Result<Bson> {
        match &self.kind {
            FieldKind::String => match value {
                Bson::String(_) => Ok(value.clone()),
                other => Err(self.invalid(format!("{other} is not a string"))),
            },
            FieldKind::Integer => match value {
                Bson::Int64(_) => Ok(value.clone()),
                Bson::Int32(n) => Ok(Bson::Int64(i64::from(*n))),
                // `as` would saturate past i64 range, so bound-check first.
                // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
                Bson::Double(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                    Ok(Bson::Int64(*f as i64))
                }
                Bson::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Bson::Int64)
                    .map_err(|_| self.invalid(format!("'{s}' is not an integer"))),
                other => Err(self.invalid(format!("{other} is not an integer"))),
            },
            FieldKind::Boolean => match value {
                Bson::Boolean(_) => Ok(value.clone()),
                Bson::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Bson::Boolean(true)),
                    "false" | "0" => Ok(Bson::Boolean(false)),
                    _ => Err(self.invalid(format!("'{s}' is not a boolean"))),
                },
                other => Err(self.invalid(format!("{other} is not a boolean"))),
            },
            FieldKind::Float => match value {
                Bson::Double(_) => Ok(value.clone()),
                Bson::Int32(n) => Ok(Bson::Double(f64::from(*n))),
                Bson::Int64(n) => Ok(Bson::Double(*n as f64)),
                Bson::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Bson::Double)
                    .map_err(|_| self.invalid(format!("'{s}' is not a float"))),
                other => Err(self.invalid(format!("{other} is not a float"))),
            },
            FieldKind::Decimal => match value {
                Bson::Decimal128(_) => Ok(value.clone()),
                Bson::String(s) => s
                    .trim()
                    .parse::<Decimal128>()
                    .map(Bson::Decimal128)
                    .map_err(|_| self.invalid(format!("'{s}' is not a decimal"))),
                Bson::Int32(n) => self.coerce(catalog, &Bson::String(n.to_string())),
                Bson::Int64(n) => self.coerce(catalog, &Bson::String(n.to_string())),
                Bson::Double(f) => self.coerce(catalog, &Bson::String(f.to_string())),
                other => Err(self.invalid(format!("{other} is not a decimal"))),
            },
            FieldKind::Date => match value {
                Bson::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| Bson::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| self.invalid(format!("'{s}' is not a date"))),
                other => Err(self.invalid(format!("{other} is not a date"))),
            },
            FieldKind::DateTime => match value {
                Bson::DateTime(_) => Ok(value.clone()),
                Bson::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Bson::DateTime(bson::DateTime::from_chrono(dt.with_timezone(&Utc))))
                    .map_err(|_| self.invalid(format!("'{s}' is not a datetime"))),
                other => Err(self.invalid(format!("{other} is not a datetime"))),
            },
            FieldKind::Time => match value {
                Bson::String(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .map(|t| Bson::String(t.format("%H:%M:%S").to_string()))
                    .map_err(|_| self.invalid(format!("'{s}' is not a time"))),
                other => Err(self.invalid(format!("{other} is not a time"))),
            },
            FieldKind::ObjectId => match value {
                Bson::ObjectId(_) => Ok(value.clone()),
                Bson::String(s) => ObjectId::parse_str(s)
                    .map(Bson::ObjectId)
                    .map_err(|_| self.invalid(format!("'{s}' is not a valid object id"))),
                other => Err(self.invalid(format!("{other} is not a valid object id"))),
            },
            FieldKind::GlobalRef => match value {
                Bson::String(s) => {
                    if let Some(catalog) = catalog {
                        if !catalog.contains(s) {
                            return Err(
                                self.invalid(format!("'{s}' does not resolve to a registered type"))
                            );
                        }
                    }
                    Ok(value.clone())
                }
                other => Err(self.invalid(format!("{other} is not a symbol name"))),
            },
            FieldKind::Embedded(_) | FieldKind::EmbeddedList(_) => {
                // Embedded values never reach scalar coercion.
                Err(self.invalid("embedded values must be documents"))
            }
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::Invalid {
            field: if self.name.is_empty() {
                "<unbound>".to_string()
            } else {
                self.name.clone()
            },
            reason: reason.into(),
        }
    }
}
