//! Error and result types for the document-mapping engine.
//!
//! All fallible operations in this crate return [`Result<T>`], which is a
//! specialized `Result` over [`Error`]. The variants mirror the places a
//! mapping operation can fail: a single field value ([`Error::Invalid`]), an
//! instance attribute access ([`Error::Attribute`]), a type-level operation
//! such as construction or polymorphic resolution ([`Error::Type`]), and the
//! controller-level cardinality errors raised by `read`.

use thiserror::Error;

/// Represents all possible errors raised by the document-mapping engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A single field value failed type coercion or a custom validator.
    ///
    /// Carries the offending field name and a human-readable reason. Raised
    /// deep inside field serialization/deserialization and propagated
    /// unchanged unless explicitly remapped by an outer layer.
    #[error("Invalid value for field '{field}': {reason}")]
    Invalid {
        /// Name of the field that rejected the value.
        field: String,
        /// Human-readable description of the violation.
        reason: String,
    },
    /// An attribute write targeted an undeclared field, or a value of the
    /// wrong shape was assigned to an embedded field.
    ///
    /// This is the public error surfaced by instance mutation; validation
    /// failures are wrapped so the raw schema error never leaks.
    #[error("Attribute error: {0}")]
    Attribute(String),
    /// Construction received unknown keys, polymorphic deserialization found
    /// zero or multiple candidate types, or a list field received elements
    /// of the wrong concrete type.
    #[error("Type error: {0}")]
    Type(String),
    /// A `read` operation matched no documents.
    #[error("No result for: {0}")]
    NoResultFound(String),
    /// A `read` operation matched more than one document.
    #[error("Many results for: {0}")]
    MultipleResultsFound(String),
    /// An error occurred in the storage collaborator.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document-mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Remaps an attribute-level error into a type-level error.
    ///
    /// Document construction routes every supplied value through the same
    /// assignment path used for instance mutation; failures there surface as
    /// [`Error::Type`] to the constructor's caller.
    pub(crate) fn into_type_error(self) -> Error {
        match self {
            Error::Attribute(msg) => Error::Type(msg),
            Error::Invalid { field, reason } => {
                Error::Type(format!("invalid value for field '{field}': {reason}"))
            }
            other => other,
        }
    }

    /// Wraps a validation error into the public attribute error surface.
    pub(crate) fn into_attribute_error(self) -> Error {
        match self {
            Error::Invalid { field, reason } => {
                Error::Attribute(format!("invalid value for field '{field}': {reason}"))
            }
            Error::Type(msg) => Error::Attribute(msg),
            other => other,
        }
    }
}
