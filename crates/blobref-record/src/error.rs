use blobref_types::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("field name is reserved: {0}")]
    ReservedField(String),

    #[error("field is externalized: {0}")]
    ExternalizedField(String),

    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
