//! Fault-injecting collaborators for synchronizer tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blobref_record::{Document, InMemoryRecordStore, Record, RecordError, RecordResult, RecordStore};
use blobref_refs::FieldName;
use blobref_store::{BlobMetadata, BlobStore, InMemoryBlobStore, StoreError, StoreResult, StoredBlob};
use blobref_types::{BlobId, RecordId};
use bytes::Bytes;

pub fn field(name: &str) -> FieldName {
    FieldName::new(name).unwrap()
}

/// Wraps an in-memory store and fails selected calls.
#[derive(Default)]
pub struct FaultyBlobStore {
    pub inner: InMemoryBlobStore,
    fail_put_fields: Mutex<HashSet<String>>,
    slow_put_fields: Mutex<HashSet<String>>,
    fail_get: Mutex<HashSet<BlobId>>,
    fail_delete: Mutex<HashSet<BlobId>>,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FaultyBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_put_for(&self, field: &str) {
        self.fail_put_fields.lock().unwrap().insert(field.to_string());
    }

    /// Puts for this field sleep before completing.
    pub fn slow_put_for(&self, field: &str) {
        self.slow_put_fields.lock().unwrap().insert(field.to_string());
    }

    pub fn fail_get_of(&self, id: BlobId) {
        self.fail_get.lock().unwrap().insert(id);
    }

    pub fn fail_delete_of(&self, id: BlobId) {
        self.fail_delete.lock().unwrap().insert(id);
    }

    pub fn heal(&self) {
        self.fail_put_fields.lock().unwrap().clear();
        self.fail_get.lock().unwrap().clear();
        self.fail_delete.lock().unwrap().clear();
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(&self, bucket: &str, data: Bytes, metadata: BlobMetadata) -> StoreResult<BlobId> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let slow = self
            .slow_put_fields
            .lock()
            .unwrap()
            .contains(&metadata.field_name);
        if slow {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        let fail = self
            .fail_put_fields
            .lock()
            .unwrap()
            .contains(&metadata.field_name);
        if fail {
            return Err(StoreError::Unavailable(format!(
                "put refused for {}",
                metadata.field_name
            )));
        }
        self.inner.put(bucket, data, metadata).await
    }

    async fn get_blob(&self, bucket: &str, id: &BlobId) -> StoreResult<StoredBlob> {
        if self.fail_get.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!("get refused for {id}")));
        }
        self.inner.get_blob(bucket, id).await
    }

    async fn delete(&self, bucket: &str, id: &BlobId) -> StoreResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!("delete refused for {id}")));
        }
        self.inner.delete(bucket, id).await
    }

    async fn list(&self, bucket: &str) -> StoreResult<Vec<BlobId>> {
        self.inner.list(bucket).await
    }
}

/// Puts, gets and deletes wait at a barrier until `parties` of them are
/// in flight at once.
pub struct BarrierBlobStore {
    pub inner: InMemoryBlobStore,
    barrier: tokio::sync::Barrier,
}

impl BarrierBlobStore {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryBlobStore::new(),
            barrier: tokio::sync::Barrier::new(parties),
        })
    }
}

#[async_trait]
impl BlobStore for BarrierBlobStore {
    async fn put(&self, bucket: &str, data: Bytes, metadata: BlobMetadata) -> StoreResult<BlobId> {
        self.barrier.wait().await;
        self.inner.put(bucket, data, metadata).await
    }

    async fn get_blob(&self, bucket: &str, id: &BlobId) -> StoreResult<StoredBlob> {
        self.barrier.wait().await;
        self.inner.get_blob(bucket, id).await
    }

    async fn delete(&self, bucket: &str, id: &BlobId) -> StoreResult<bool> {
        self.barrier.wait().await;
        self.inner.delete(bucket, id).await
    }

    async fn list(&self, bucket: &str) -> StoreResult<Vec<BlobId>> {
        self.inner.list(bucket).await
    }
}

/// Record store whose `persist` can be switched to fail.
#[derive(Default)]
pub struct FlakyRecordStore {
    pub inner: InMemoryRecordStore<Document>,
    pub fail_persist: AtomicBool,
    pub persists: AtomicUsize,
}

#[async_trait]
impl RecordStore<Document> for FlakyRecordStore {
    async fn persist(&self, record: &Document) -> RecordResult<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(RecordError::Unavailable("persist refused".into()));
        }
        self.inner.persist(record).await
    }

    async fn load(&self, id: &RecordId) -> RecordResult<Option<Document>> {
        self.inner.load(id).await
    }

    async fn remove(&self, id: &RecordId) -> RecordResult<bool> {
        self.inner.remove(id).await
    }
}

/// Reference map entries as `(field, blob)` pairs.
pub fn refs_of(doc: &Document) -> Vec<(String, BlobId)> {
    doc.blob_refs()
        .iter()
        .map(|(f, id)| (f.to_string(), *id))
        .collect()
}
