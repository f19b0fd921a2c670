use blobref_record::RecordError;
use blobref_refs::{FieldName, RefError};
use blobref_store::StoreError;
use blobref_types::BlobId;
use thiserror::Error;

/// Errors from whole-record synchronization operations.
///
/// Field-level failures carry the name of the field that failed so callers
/// can tell which unit of work aborted the operation.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid sync configuration: {0}")]
    Config(String),

    #[error("field {field}: blob store error: {source}")]
    Store {
        field: FieldName,
        #[source]
        source: StoreError,
    },

    #[error("field {field}: cannot encode value: {source}")]
    Encode {
        field: FieldName,
        #[source]
        source: serde_json::Error,
    },

    #[error("field {field}: cannot decode blob {blob}: {source}")]
    Decode {
        field: FieldName,
        blob: BlobId,
        #[source]
        source: serde_json::Error,
    },

    #[error("field {field}: reference map rejected update: {source}")]
    Reference {
        field: FieldName,
        #[source]
        source: RefError,
    },

    #[error("field {field}: value is stored inline in the record")]
    Inline { field: FieldName },

    #[error("record persistence failed: {0}")]
    Persist(#[from] RecordError),

    #[error("blob listing failed: {0}")]
    Scan(#[source] StoreError),
}

impl SyncError {
    /// The field whose unit of work failed, if the error is field-scoped.
    pub fn field(&self) -> Option<&FieldName> {
        match self {
            Self::Store { field, .. }
            | Self::Encode { field, .. }
            | Self::Decode { field, .. }
            | Self::Reference { field, .. }
            | Self::Inline { field } => Some(field),
            Self::Config(_) | Self::Persist(_) | Self::Scan(_) => None,
        }
    }

    /// Returns `true` if a referenced blob was missing from the store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Store {
                source: StoreError::NotFound(_),
                ..
            }
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
