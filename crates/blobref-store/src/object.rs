use blobref_types::{BlobId, RecordId};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type recorded for JSON-encoded field values.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Audit tags written alongside every blob.
///
/// The record and field name let an operator trace a blob back to the
/// record it was saved for. Nothing looks blobs up by these fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Identifier of the owning record.
    pub record_id: RecordId,
    /// Name of the externalized field whose value this blob holds.
    pub field_name: String,
    /// MIME type of the stored bytes.
    pub content_type: String,
    /// When the blob was written.
    pub created_at: DateTime<Utc>,
}

impl BlobMetadata {
    /// Metadata for a JSON-encoded field value, stamped with the current time.
    pub fn new(record_id: RecordId, field_name: impl Into<String>) -> Self {
        Self {
            record_id,
            field_name: field_name.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A blob as held by a store: identifier, raw bytes, metadata, cached size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub id: BlobId,
    pub data: Bytes,
    pub metadata: BlobMetadata,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredBlob {
    pub fn new(id: BlobId, data: Bytes, metadata: BlobMetadata) -> Self {
        let size = data.len() as u64;
        Self {
            id,
            data,
            metadata,
            size,
        }
    }

    /// Returns `true` if this blob was written for the given record.
    pub fn belongs_to(&self, record_id: &RecordId) -> bool {
        self.metadata.record_id == *record_id
    }
}
