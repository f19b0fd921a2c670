//! Error types for reference map operations.

use blobref_types::BlobId;
use thiserror::Error;

/// Errors that can occur when naming fields or editing a reference map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    /// The field name is invalid.
    #[error("invalid field name: {name:?}: {reason}")]
    InvalidFieldName { name: String, reason: String },

    /// The same field name was listed more than once.
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },

    /// Another field already points at this blob.
    #[error("blob {blob} is already referenced by field {field}")]
    BlobAlreadyReferenced { blob: BlobId, field: String },
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
