use std::sync::Arc;

use blobref_record::{Record, RecordStore};
use blobref_types::RecordId;
use tracing::debug;

use crate::error::SyncResult;
use crate::hooks::LifecycleHook;

/// Persistence orchestration for records with lifecycle hooks.
///
/// `persist` runs every hook's `before_persist` in registration order and
/// then saves the record; `remove` runs every `before_delete` and then
/// removes it. The first hook error aborts the step and the record store is
/// left untouched.
pub struct ManagedRecords<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    hooks: Vec<Arc<dyn LifecycleHook<R>>>,
}

impl<R: Record + 'static> ManagedRecords<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            store,
            hooks: Vec::new(),
        }
    }

    /// Register a hook; hooks run in the order they were added.
    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook<R>>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore<R>> {
        &self.store
    }

    pub async fn persist(&self, record: &mut R) -> SyncResult<()> {
        for hook in &self.hooks {
            hook.before_persist(record).await?;
        }
        self.store.persist(record).await?;
        debug!(record = %record.record_id(), "record persisted");
        Ok(())
    }

    pub async fn load(&self, id: &RecordId) -> SyncResult<Option<R>> {
        Ok(self.store.load(id).await?)
    }

    /// Run delete hooks, then remove the record. Returns `true` if it existed.
    pub async fn remove(&self, record: &mut R) -> SyncResult<bool> {
        for hook in &self.hooks {
            hook.before_delete(record, self.store.as_ref()).await?;
        }
        let removed = self.store.remove(&record.record_id()).await?;
        debug!(record = %record.record_id(), removed, "record removed");
        Ok(removed)
    }
}
