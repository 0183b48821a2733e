//! # Errors
//!
//! This module defines the common error types used throughout the modeling
//! layer. By centralizing error definitions, we ensure consistent error
//! handling across records, serializers, and transport adapters.

/// Errors that can occur within the data-modeling layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A type name could not be resolved to a registered model type.
    #[error("cannot resolve model type `{0}`")]
    TypeResolution(String),

    /// A value of the wrong model type was assigned to a typed relationship.
    #[error("relationship `{relationship}` expects `{expected}`, got `{actual}`")]
    RelationshipTypeMismatch {
        relationship: String,
        expected: String,
        actual: String,
    },

    /// A field name is not declared on the model's schema.
    #[error("`{model}` has no declared field `{field}`")]
    UnknownField { model: String, field: String },

    /// The model type was registered as read-only; it cannot be saved or
    /// deleted through the transport.
    #[error("model type `{0}` is read-only")]
    ReadOnly(String),

    /// The owning client was dropped while records were still live.
    #[error("client has been dropped")]
    ClientDropped,

    /// The transport could not find the requested resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Opaque failure passed through from the transport adapter.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error>),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
