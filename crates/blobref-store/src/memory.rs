use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use blobref_types::BlobId;
use bytes::Bytes;
use tracing::debug;

use crate::error::{check_bucket, StoreError, StoreResult};
use crate::object::{BlobMetadata, StoredBlob};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Buckets map to their own `HashMap`
/// behind a single `RwLock`. Blob data is reference-counted (`Bytes`), so
/// reads are cheap clones.
pub struct InMemoryBlobStore {
    buckets: RwLock<HashMap<String, HashMap<BlobId, StoredBlob>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored across all buckets.
    pub fn len(&self) -> usize {
        self.buckets
            .read()
            .expect("lock poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Returns `true` if no bucket holds any blob.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .read()
            .expect("lock poisoned")
            .values()
            .flat_map(HashMap::values)
            .map(|blob| blob.size)
            .sum()
    }

    /// Remove every blob from every bucket.
    pub fn clear(&self) {
        self.buckets.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: &str, data: Bytes, metadata: BlobMetadata) -> StoreResult<BlobId> {
        check_bucket(bucket)?;
        let id = BlobId::new();
        let blob = StoredBlob::new(id, data, metadata);
        debug!(bucket, blob = %id, size = blob.size, "stored blob");
        self.buckets
            .write()
            .expect("lock poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(id, blob);
        Ok(id)
    }

    async fn get_blob(&self, bucket: &str, id: &BlobId) -> StoreResult<StoredBlob> {
        check_bucket(bucket)?;
        let buckets = self.buckets.read().expect("lock poisoned");
        buckets
            .get(bucket)
            .and_then(|blobs| blobs.get(id))
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn delete(&self, bucket: &str, id: &BlobId) -> StoreResult<bool> {
        check_bucket(bucket)?;
        let mut buckets = self.buckets.write().expect("lock poisoned");
        Ok(buckets
            .get_mut(bucket)
            .and_then(|blobs| blobs.remove(id))
            .is_some())
    }

    async fn list(&self, bucket: &str) -> StoreResult<Vec<BlobId>> {
        check_bucket(bucket)?;
        let buckets = self.buckets.read().expect("lock poisoned");
        let mut ids: Vec<BlobId> = buckets
            .get(bucket)
            .map(|blobs| blobs.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}
