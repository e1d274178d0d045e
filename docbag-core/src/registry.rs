//! Per-type field registries and the schema merge algorithm.
//!
//! A [`Registry`] is the source of truth for which fields a document type
//! carries: the merged result of every base type's registry plus the fields
//! declared directly on the type. Each registry is owned by exactly one
//! [`DocumentType`](crate::document::DocumentType).
//!
//! # Merge Semantics
//!
//! Base fields are cloned into the new registry, never shared: mutating a
//! subtype's copy of a field must not affect the base type. On a name
//! collision, later bases override earlier ones, and locally declared fields
//! override every base.

use std::collections::BTreeMap;

use crate::field::Field;

/// The per-type table of fields, plus fast-lookup lists of the embedded
/// field names used during polymorphic resolution.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    fields: BTreeMap<String, Field>,
    embedded_docs: Vec<String>,
    embedded_lists: Vec<String>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry by merging base registries and overlaying locally
    /// declared fields.
    ///
    /// Bases are applied in declaration order, so a later base wins a name
    /// collision against an earlier one; locally declared fields win against
    /// every base. Every inherited field is an independent clone rebound to
    /// its name.
    pub fn build(bases: &[&Registry], declared: &[(String, Field)]) -> Self {
        let mut registry = Registry::new();

        for base in bases {
            for (name, field) in &base.fields {
                registry.add(name, field.clone_unbound());
            }
        }

        for (name, field) in declared {
            registry.add(name, field.clone_unbound());
        }

        registry
    }

    /// Binds the field to `name` and adds it, replacing any previous field
    /// of that name.
    pub fn add(&mut self, name: &str, mut field: Field) {
        field.set_name(name);

        self.embedded_docs.retain(|n| n != name);
        self.embedded_lists.retain(|n| n != name);
        if field.is_embedded_doc() {
            self.embedded_docs.push(name.to_string());
        } else if field.is_embedded_list() {
            self.embedded_lists.push(name.to_string());
        }

        self.fields.insert(name.to_string(), field);
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether a field of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over all fields, keyed by bound name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Iterates over all field names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The number of fields in this registry.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this registry has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of embedded-document fields, recorded at build time.
    pub fn embedded_docs(&self) -> &[String] {
        &self.embedded_docs
    }

    /// Names of embedded-list fields, recorded at build time.
    pub fn embedded_lists(&self) -> &[String] {
        &self.embedded_lists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    fn declared(pairs: Vec<(&str, Field)>) -> Vec<(String, Field)> {
        pairs
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect()
    }

    #[test]
    fn build_merges_bases_and_binds_names() {
        let base = Registry::build(
            &[],
            &declared(vec![("name", Field::string()), ("age", Field::integer())]),
        );
        let registry = Registry::build(
            &[&base],
            &declared(vec![("surname", Field::string())]),
        );

        assert_eq!(registry.len(), 3);
        for name in ["name", "age", "surname"] {
            assert_eq!(registry.get(name).unwrap().name(), name);
        }
    }

    #[test]
    fn later_base_and_local_declarations_win() {
        let first = Registry::build(&[], &declared(vec![("value", Field::string())]));
        let second = Registry::build(&[], &declared(vec![("value", Field::integer())]));

        let merged = Registry::build(&[&first, &second], &[]);
        assert_eq!(merged.get("value").unwrap().kind(), &FieldKind::Integer);

        let overridden = Registry::build(
            &[&first, &second],
            &declared(vec![("value", Field::boolean())]),
        );
        assert_eq!(overridden.get("value").unwrap().kind(), &FieldKind::Boolean);
    }

    #[test]
    fn inherited_fields_are_clones_not_aliases() {
        let base = Registry::build(&[], &declared(vec![("name", Field::string())]));
        let mut sub = Registry::build(&[&base], &[]);

        // Replacing the subtype's copy must leave the base untouched.
        sub.add("name", Field::integer());
        assert_eq!(sub.get("name").unwrap().kind(), &FieldKind::Integer);
        assert_eq!(base.get("name").unwrap().kind(), &FieldKind::String);
    }

    #[test]
    fn embedded_fields_are_recorded_separately() {
        let registry = Registry::build(
            &[],
            &declared(vec![
                ("name", Field::string()),
                ("ed", Field::embedded("Simple")),
                ("edl", Field::embedded_list("Simple")),
            ]),
        );

        assert_eq!(registry.embedded_docs(), &["ed".to_string()]);
        assert_eq!(registry.embedded_lists(), &["edl".to_string()]);

        // Replacing an embedded field with a scalar drops the record.
        let mut registry = registry;
        registry.add("ed", Field::string());
        assert!(registry.embedded_docs().is_empty());
    }
}
