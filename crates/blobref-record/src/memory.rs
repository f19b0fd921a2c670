use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use async_trait::async_trait;
use blobref_types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::RecordResult;
use crate::traits::{Record, RecordStore};

/// In-memory record store.
///
/// Records are kept in their serialized JSON form, so every `load` returns a
/// fresh copy carrying exactly what was persisted: plain fields and the
/// reference map, never in-memory externalized values.
pub struct InMemoryRecordStore<R> {
    records: RwLock<HashMap<RecordId, Vec<u8>>>,
    _record: PhantomData<fn() -> R>,
}

impl<R> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            _record: PhantomData,
        }
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The persisted JSON form of a record, for inspection.
    pub fn raw(&self, id: &RecordId) -> Option<serde_json::Value> {
        let records = self.records.read().expect("lock poisoned");
        records
            .get(id)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for InMemoryRecordStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl<R> RecordStore<R> for InMemoryRecordStore<R>
where
    R: Record + Serialize + DeserializeOwned + 'static,
{
    async fn persist(&self, record: &R) -> RecordResult<()> {
        let id = record.record_id();
        let bytes = serde_json::to_vec(record)?;
        debug!(record = %id, size = bytes.len(), "persisted record");
        self.records
            .write()
            .expect("lock poisoned")
            .insert(id, bytes);
        Ok(())
    }

    async fn load(&self, id: &RecordId) -> RecordResult<Option<R>> {
        let bytes = {
            let records = self.records.read().expect("lock poisoned");
            match records.get(id) {
                Some(bytes) => bytes.clone(),
                None => return Ok(None),
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn remove(&self, id: &RecordId) -> RecordResult<bool> {
        let removed = self
            .records
            .write()
            .expect("lock poisoned")
            .remove(id)
            .is_some();
        debug!(record = %id, removed, "removed record");
        Ok(removed)
    }
}
