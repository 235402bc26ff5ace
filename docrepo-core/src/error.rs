//! Error types and result types for repository operations.
//!
//! Every fallible operation in the workspace returns [`RepositoryResult<T>`].
//! Errors are surfaced synchronously to the caller and are never retried.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with a document repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Supplied data violates the document descriptor (missing required field,
    /// wrong type, value out of declared range, undeclared field on a strict schema).
    #[error("Validation error: {0}")]
    Validation(String),
    /// No visible record matched the given identifier.
    #[error("{model} record {id} not found")]
    NotFound {
        /// The model name the repository is bound to.
        model: String,
        /// The identifier that was looked up.
        id: String,
    },
    /// The identifier cannot be converted to the store's native identifier type.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A querystring operator token was rejected by strict resolution.
    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Connectivity, timeout, or driver-level failure from the underlying store.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn not_found(model: impl Into<String>, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            model: model.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RepositoryError::Validation(_))
    }
}

/// A specialized `Result` type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
