use std::sync::Arc;

use blobref_record::{Document, InMemoryRecordStore, Record, RecordStore};
use blobref_store::{BlobStore, FsBlobStore, InMemoryBlobStore};
use blobref_sync::{BlobHook, BlobSynchronizer, ManagedRecords};
use blobref_types::{BlobId, RecordId};
use tracing::info;

use crate::config::{BackendConfig, BlobRefConfig};
use crate::error::{SdkError, SdkResult};

/// High-level blobref API.
///
/// Documents saved through a `BlobRef` have their configured fields moved
/// out to the blob store; the primary record keeps plain fields and the
/// reference map only.
pub struct BlobRef {
    config: BlobRefConfig,
    blobs: Arc<dyn BlobStore>,
    records: Arc<InMemoryRecordStore<Document>>,
    sync: Arc<BlobSynchronizer>,
    managed: ManagedRecords<Document>,
}

impl BlobRef {
    /// Open the configured backend and wire the synchronizer into the
    /// record lifecycle.
    pub async fn open(config: BlobRefConfig) -> SdkResult<Self> {
        let sync_config = config.to_sync_config()?;
        let blobs: Arc<dyn BlobStore> = match &config.backend {
            BackendConfig::Memory => Arc::new(InMemoryBlobStore::new()),
            BackendConfig::Fs { root } => Arc::new(FsBlobStore::open(root).await?),
        };
        let records = Arc::new(InMemoryRecordStore::<Document>::new());
        let sync = Arc::new(BlobSynchronizer::new(blobs.clone(), sync_config)?);
        let managed = ManagedRecords::<Document>::new(records.clone())
            .with_hook(Arc::new(BlobHook::new(sync.clone())));

        info!(
            bucket = %config.bucket,
            fields = config.fields.len(),
            backend = ?config.backend,
            "blobref opened"
        );
        Ok(Self {
            config,
            blobs,
            records,
            sync,
            managed,
        })
    }

    /// In-memory instance externalizing `fields`.
    pub async fn in_memory<I, S>(fields: I) -> SdkResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open(BlobRefConfig::new(fields)).await
    }

    pub fn config(&self) -> &BlobRefConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &Arc<BlobSynchronizer> {
        &self.sync
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // ---- Document lifecycle ----

    pub fn new_document(&self) -> Document {
        Document::new()
    }

    /// Save externalized fields, then persist the document.
    pub async fn save(&self, doc: &mut Document) -> SdkResult<()> {
        self.managed.persist(doc).await?;
        Ok(())
    }

    /// Load the persisted document without its externalized values.
    pub async fn load(&self, id: &RecordId) -> SdkResult<Option<Document>> {
        Ok(self.managed.load(id).await?)
    }

    /// Load the persisted document and fill in every externalized value.
    pub async fn fetch(&self, id: &RecordId) -> SdkResult<Document> {
        let doc = self
            .managed
            .load(id)
            .await?
            .ok_or(SdkError::RecordNotFound(*id))?;
        Ok(self.sync.retrieved(doc).await?)
    }

    pub async fn retrieve(&self, doc: &mut Document) -> SdkResult<()> {
        self.sync.retrieve(doc).await?;
        Ok(())
    }

    /// Delete the document's blobs and persist the emptied reference map.
    pub async fn unlink(&self, doc: &mut Document) -> SdkResult<()> {
        self.sync.unlink(doc, self.records.as_ref()).await?;
        Ok(())
    }

    /// Unlink the document's blobs, then delete the document itself.
    pub async fn remove(&self, doc: &mut Document) -> SdkResult<bool> {
        Ok(self.managed.remove(doc).await?)
    }

    // ---- Diagnostics ----

    pub async fn orphans(&self, doc: &Document) -> SdkResult<Vec<BlobId>> {
        Ok(self.sync.orphans(doc).await?)
    }

    /// Number of blobs in the configured bucket.
    pub async fn blob_count(&self) -> SdkResult<usize> {
        Ok(self.blobs.list(&self.config.bucket).await?.len())
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Whether a record with this id is currently persisted.
    pub async fn contains(&self, id: &RecordId) -> SdkResult<bool> {
        Ok(self.records.load(id).await?.is_some())
    }
}

impl std::fmt::Debug for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRef")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

/// Reference map entries of `doc`, for display.
pub fn describe_refs(doc: &Document) -> Vec<(String, BlobId)> {
    doc.blob_refs()
        .iter()
        .map(|(field, blob)| (field.to_string(), *blob))
        .collect()
}
