use blobref_types::BlobId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found in the bucket.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The backend could not be reached (transport or network failure).
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    /// Bucket names must be non-empty and path-safe.
    #[error("invalid bucket name: {0:?}")]
    InvalidBucket(String),

    /// Blob metadata could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reject bucket names that are empty or could escape a directory layout.
pub(crate) fn check_bucket(bucket: &str) -> StoreResult<()> {
    let valid = !bucket.is_empty()
        && bucket != "."
        && bucket != ".."
        && !bucket.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidBucket(bucket.to_string()))
    }
}
