use std::sync::Arc;

use async_trait::async_trait;
use blobref_record::{Record, RecordStore};

use crate::error::SyncResult;
use crate::synchronizer::BlobSynchronizer;

/// Callbacks run by [`ManagedRecords`](crate::ManagedRecords) around record
/// persistence. An error from either callback aborts the lifecycle step
/// before the record store is touched.
#[async_trait]
pub trait LifecycleHook<R: Record>: Send + Sync {
    async fn before_persist(&self, record: &mut R) -> SyncResult<()>;
    async fn before_delete(&self, record: &mut R, records: &dyn RecordStore<R>) -> SyncResult<()>;
}

pub struct NoOpHook;

#[async_trait]
impl<R: Record + 'static> LifecycleHook<R> for NoOpHook {
    async fn before_persist(&self, _record: &mut R) -> SyncResult<()> {
        Ok(())
    }

    async fn before_delete(&self, _record: &mut R, _records: &dyn RecordStore<R>) -> SyncResult<()> {
        Ok(())
    }
}

/// Runs Save before every persist and Unlink before every delete.
#[derive(Clone, Debug)]
pub struct BlobHook {
    synchronizer: Arc<BlobSynchronizer>,
}

impl BlobHook {
    pub fn new(synchronizer: Arc<BlobSynchronizer>) -> Self {
        Self { synchronizer }
    }

    pub fn synchronizer(&self) -> &Arc<BlobSynchronizer> {
        &self.synchronizer
    }
}

#[async_trait]
impl<R: Record + 'static> LifecycleHook<R> for BlobHook {
    async fn before_persist(&self, record: &mut R) -> SyncResult<()> {
        self.synchronizer.save(record).await
    }

    async fn before_delete(&self, record: &mut R, records: &dyn RecordStore<R>) -> SyncResult<()> {
        self.synchronizer.unlink(record, records).await
    }
}
