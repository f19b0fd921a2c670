use async_trait::async_trait;
use blobref_types::BlobId;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::object::{BlobMetadata, StoredBlob};

/// Bucket-scoped blob store.
///
/// All implementations must satisfy these invariants:
/// - `put` always creates a new object and returns a new ID; it never
///   overwrites an existing blob.
/// - Blobs are immutable once written.
/// - Concurrent calls on different blobs are always safe.
/// - The store never interprets blob contents.
/// - I/O and transport errors are propagated, never silently ignored.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` as a new blob in `bucket` and return its ID.
    async fn put(&self, bucket: &str, data: Bytes, metadata: BlobMetadata) -> StoreResult<BlobId>;

    /// Read a blob with its metadata.
    ///
    /// Returns `Err(StoreError::NotFound)` if the ID is unknown in `bucket`.
    async fn get_blob(&self, bucket: &str, id: &BlobId) -> StoreResult<StoredBlob>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, bucket: &str, id: &BlobId) -> StoreResult<bool>;

    /// List all blob IDs in `bucket`, sorted.
    async fn list(&self, bucket: &str) -> StoreResult<Vec<BlobId>>;

    /// Read the raw bytes of a blob.
    async fn get(&self, bucket: &str, id: &BlobId) -> StoreResult<Bytes> {
        Ok(self.get_blob(bucket, id).await?.data)
    }

    /// Check whether a blob exists in `bucket`.
    async fn exists(&self, bucket: &str, id: &BlobId) -> StoreResult<bool> {
        match self.get_blob(bucket, id).await {
            Ok(_) => Ok(true),
            Err(crate::StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
