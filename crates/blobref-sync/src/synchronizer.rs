use std::sync::Arc;

use blobref_record::{Record, RecordStore};
use blobref_refs::FieldName;
use blobref_store::{BlobMetadata, BlobStore};
use blobref_types::BlobId;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Saves, retrieves and unlinks the externalized fields of records.
///
/// Every whole-record operation runs one unit of work per configured field
/// concurrently. Units never touch the record; their results are applied at
/// a single join point as they arrive. The first failing unit aborts the
/// operation and the remaining in-flight units are dropped, so a late
/// success can never be applied after the operation has already failed.
///
/// Callers must serialize lifecycle operations on the same record.
pub struct BlobSynchronizer {
    store: Arc<dyn BlobStore>,
    config: SyncConfig,
}

impl BlobSynchronizer {
    /// Create a synchronizer over `store`, validating `config`.
    pub fn new(store: Arc<dyn BlobStore>, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    // ---- Save ----

    /// Write every set externalized field to a fresh blob.
    ///
    /// Unset fields are skipped and keep whatever reference they had. For
    /// each saved field the reference map is repointed at the new blob.
    /// Superseded blobs are deleted on a best-effort basis, and only once
    /// every field has been applied.
    ///
    /// On error, fields whose puts already completed keep their new
    /// references and every superseded blob is left in place; nothing is
    /// rolled back.
    pub async fn save<R: Record>(&self, record: &mut R) -> SyncResult<()> {
        let record_id = record.record_id();
        if let Some(field) = self
            .config
            .field_names
            .iter()
            .find(|field| record.has_plain_field(field))
        {
            return Err(SyncError::Inline {
                field: field.clone(),
            });
        }

        let mut pending = FuturesUnordered::new();
        for field in &self.config.field_names {
            let Some(value) = record.field(field) else {
                debug!(record = %record_id, field = %field, "field unset, skipping save");
                continue;
            };
            let data = serde_json::to_vec(&value).map_err(|source| SyncError::Encode {
                field: field.clone(),
                source,
            })?;
            let metadata = BlobMetadata::new(record_id, field.as_str())
                .with_content_type(self.config.content_type.as_str());
            let previous = record.blob_refs().get(field);
            pending.push(self.save_field(field, Bytes::from(data), metadata, previous));
        }

        let issued = pending.len();
        let mut superseded = Vec::new();
        while let Some(result) = pending.next().await {
            let (field, blob, previous) = result?;
            record
                .blob_refs_mut()
                .set(field, Some(blob))
                .map_err(|source| SyncError::Reference {
                    field: field.clone(),
                    source,
                })?;
            if let Some(old) = previous {
                superseded.push((field, old));
            }
        }

        self.discard_superseded(superseded).await;
        info!(record = %record_id, saved = issued, bucket = self.bucket(), "saved externalized fields");
        Ok(())
    }

    async fn save_field<'a>(
        &'a self,
        field: &'a FieldName,
        data: Bytes,
        metadata: BlobMetadata,
        previous: Option<BlobId>,
    ) -> SyncResult<(&'a FieldName, BlobId, Option<BlobId>)> {
        let size = data.len();
        let blob = self
            .store
            .put(self.bucket(), data, metadata)
            .await
            .map_err(|source| SyncError::Store {
                field: field.clone(),
                source,
            })?;
        debug!(field = %field, blob = %blob, size, "stored field blob");
        Ok((field, blob, previous))
    }

    /// Best-effort removal of blobs no longer referenced after a save.
    ///
    /// Failures leak storage but lose no data, so they are logged and
    /// swallowed.
    async fn discard_superseded(&self, superseded: Vec<(&FieldName, BlobId)>) {
        let deletes = superseded.into_iter().map(|(field, old)| async move {
            match self.store.delete(self.bucket(), &old).await {
                Ok(true) => debug!(field = %field, blob = %old, "deleted superseded blob"),
                Ok(false) => debug!(field = %field, blob = %old, "superseded blob already gone"),
                Err(e) => warn!(
                    field = %field,
                    blob = %old,
                    error = %e,
                    "failed to delete superseded blob; leaving it orphaned"
                ),
            }
        });
        futures::future::join_all(deletes).await;
    }

    // ---- Retrieve ----

    /// Fetch and decode every referenced field into the record.
    ///
    /// Fields without a reference are left untouched, including any
    /// in-memory value that was never saved. The reference map is only read.
    pub async fn retrieve<R: Record>(&self, record: &mut R) -> SyncResult<()> {
        let record_id = record.record_id();
        let mut pending = FuturesUnordered::new();
        for field in &self.config.field_names {
            if let Some(blob) = record.blob_refs().get(field) {
                pending.push(self.fetch_field(field, blob));
            }
        }

        let issued = pending.len();
        while let Some(result) = pending.next().await {
            let (field, value) = result?;
            record.set_field(field, Some(value));
        }

        info!(record = %record_id, fetched = issued, "retrieved externalized fields");
        Ok(())
    }

    /// Owned variant of [`retrieve`](Self::retrieve) returning the populated record.
    pub async fn retrieved<R: Record>(&self, mut record: R) -> SyncResult<R> {
        self.retrieve(&mut record).await?;
        Ok(record)
    }

    async fn fetch_field<'a>(
        &'a self,
        field: &'a FieldName,
        blob: BlobId,
    ) -> SyncResult<(&'a FieldName, Value)> {
        let data = self
            .store
            .get(self.bucket(), &blob)
            .await
            .map_err(|source| SyncError::Store {
                field: field.clone(),
                source,
            })?;
        let value = serde_json::from_slice(&data).map_err(|source| SyncError::Decode {
            field: field.clone(),
            blob,
            source,
        })?;
        debug!(field = %field, blob = %blob, "fetched field blob");
        Ok((field, value))
    }

    // ---- Unlink ----

    /// Delete every referenced blob, clear the references and persist.
    ///
    /// A blob that is already gone counts as deleted, so retrying a failed
    /// unlink converges. Cleared fields also drop their in-memory value.
    ///
    /// On a delete failure the fields already cleared are persisted before
    /// the error is returned, keeping the durable reference map in line with
    /// the blob store. If that persist fails too it is logged and the
    /// original delete error is returned.
    pub async fn unlink<R: Record>(
        &self,
        record: &mut R,
        records: &dyn RecordStore<R>,
    ) -> SyncResult<()> {
        let record_id = record.record_id();
        let mut pending = FuturesUnordered::new();
        for field in &self.config.field_names {
            if let Some(blob) = record.blob_refs().get(field) {
                pending.push(self.unlink_field(field, blob));
            }
        }

        let mut cleared = 0usize;
        let mut failure = None;
        while let Some(result) = pending.next().await {
            match result {
                Ok(field) => {
                    record.blob_refs_mut().clear(field);
                    record.set_field(field, None);
                    cleared += 1;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        drop(pending);

        let Some(err) = failure else {
            records.persist(record).await?;
            info!(record = %record_id, cleared, "unlinked externalized fields");
            return Ok(());
        };

        if cleared > 0 {
            if let Err(persist_err) = records.persist(record).await {
                warn!(
                    record = %record_id,
                    cleared,
                    error = %persist_err,
                    "failed to persist partial unlink progress"
                );
            }
        }
        Err(err)
    }

    async fn unlink_field<'a>(&'a self, field: &'a FieldName, blob: BlobId) -> SyncResult<&'a FieldName> {
        let existed = self
            .store
            .delete(self.bucket(), &blob)
            .await
            .map_err(|source| SyncError::Store {
                field: field.clone(),
                source,
            })?;
        if existed {
            debug!(field = %field, blob = %blob, "deleted field blob");
        } else {
            debug!(field = %field, blob = %blob, "field blob already gone");
        }
        Ok(field)
    }

    // ---- Diagnostics ----

    /// Blobs in the bucket written for this record that its reference map
    /// no longer points at, typically superseded blobs whose best-effort
    /// deletion failed.
    pub async fn orphans<R: Record>(&self, record: &R) -> SyncResult<Vec<BlobId>> {
        let record_id = record.record_id();
        let live = record.blob_refs().blob_ids();
        let ids = self
            .store
            .list(self.bucket())
            .await
            .map_err(SyncError::Scan)?;

        let candidates = ids.into_iter().filter(|id| !live.contains(id));
        let blobs = futures::future::try_join_all(
            candidates.map(|id| async move { self.store.get_blob(self.bucket(), &id).await }),
        )
        .await
        .map_err(SyncError::Scan)?;

        Ok(blobs
            .into_iter()
            .filter(|blob| blob.belongs_to(&record_id))
            .map(|blob| blob.id)
            .collect())
    }
}

impl std::fmt::Debug for BlobSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobSynchronizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use blobref_record::{Document, InMemoryRecordStore};
    use blobref_store::{InMemoryBlobStore, StoreError};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config() -> SyncConfig {
        SyncConfig::from_names(["content", "complement"]).unwrap()
    }

    fn huge_txt() -> Document {
        let mut doc = Document::new()
            .with_value(&field("content"), "anyFetch is cool")
            .with_value(
                &field("complement"),
                json!({ "some": { "complicated": { "stuff": true } } }),
            );
        doc.set("name", "huge.txt").unwrap();
        doc
    }

    fn memory_sync() -> (Arc<InMemoryBlobStore>, BlobSynchronizer) {
        let store = Arc::new(InMemoryBlobStore::new());
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        (store, sync)
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn save_creates_one_blob_per_set_field() {
        let (store, sync) = memory_sync();
        let mut doc = huge_txt();

        sync.save(&mut doc).await.unwrap();

        assert_eq!(doc.blob_refs().len(), 2);
        assert_eq!(store.len(), 2);
        let content_blob = doc.blob_refs().get(&field("content")).unwrap();
        let stored = store.get_blob("fs", &content_blob).await.unwrap();
        assert_eq!(&stored.data[..], br#""anyFetch is cool""#);
        assert_eq!(stored.metadata.record_id, doc.id());
        assert_eq!(stored.metadata.field_name, "content");
        assert_eq!(stored.metadata.content_type, "application/json");
    }

    #[tokio::test]
    async fn save_skips_unset_fields() {
        let (store, sync) = memory_sync();
        let mut doc = Document::new().with_value(&field("content"), "only this");

        sync.save(&mut doc).await.unwrap();

        assert_eq!(refs_of(&doc).len(), 1);
        assert!(doc.blob_refs().contains(&field("content")));
        assert!(!doc.blob_refs().contains(&field("complement")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn save_with_nothing_set_is_a_noop() {
        let (store, sync) = memory_sync();
        let mut doc = Document::new();
        sync.save(&mut doc).await.unwrap();
        assert!(doc.blob_refs().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unset_field_keeps_existing_reference() {
        let (_store, sync) = memory_sync();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let before = doc.blob_refs().clone();

        doc.set_field(&field("content"), None);
        doc.set_field(&field("complement"), None);
        sync.save(&mut doc).await.unwrap();

        assert_eq!(doc.blob_refs(), &before);
    }

    #[tokio::test]
    async fn resave_replaces_blob_and_deletes_old() {
        let (store, sync) = memory_sync();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let old = doc.blob_refs().get(&field("content")).unwrap();

        doc.set_field(&field("content"), Some(json!("Some new content")));
        sync.save(&mut doc).await.unwrap();

        let new = doc.blob_refs().get(&field("content")).unwrap();
        assert_ne!(old, new);
        assert_eq!(doc.blob_refs().len(), 2);
        assert!(!store.exists("fs", &old).await.unwrap());
        // Both fields were re-saved, both old blobs deleted.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn save_uses_configured_bucket() {
        let store = Arc::new(InMemoryBlobStore::new());
        let sync =
            BlobSynchronizer::new(store.clone(), config().with_bucket("attachments")).unwrap();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();

        assert_eq!(store.list("attachments").await.unwrap().len(), 2);
        assert!(store.list("fs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_runs_field_puts_concurrently() {
        let store = BarrierBlobStore::new(2);
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();

        // Each put waits until both are in flight; sequential dispatch would hang.
        tokio::time::timeout(Duration::from_secs(5), sync.save(&mut doc))
            .await
            .expect("puts should run concurrently")
            .unwrap();
        assert_eq!(doc.blob_refs().len(), 2);
    }

    #[tokio::test]
    async fn sibling_failure_keeps_superseded_blobs() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.persist(&doc).await.unwrap();
        let old_content = doc.blob_refs().get(&field("content")).unwrap();
        let old_complement = doc.blob_refs().get(&field("complement")).unwrap();

        // content's put lands first; complement fails once content is applied.
        store.slow_put_for("complement");
        store.fail_put_for("complement");
        doc.set_field(&field("content"), Some(json!("Some new content")));
        let err = sync.save(&mut doc).await.unwrap_err();
        assert_eq!(err.field().map(FieldName::as_str), Some("complement"));

        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
        assert!(store.exists("fs", &old_content).await.unwrap());
        assert!(store.exists("fs", &old_complement).await.unwrap());

        let durable = records.load(&doc.id()).await.unwrap().unwrap();
        let durable = sync.retrieved(durable).await.unwrap();
        assert_eq!(durable.field(&field("content")), Some(json!("anyFetch is cool")));

        let written = doc.blob_refs().get(&field("content")).unwrap();
        assert_ne!(written, old_content);
        assert_eq!(sync.orphans(&durable).await.unwrap(), vec![written]);
    }

    #[tokio::test]
    async fn superseded_blobs_are_deleted_after_every_field_applies() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let old = doc.blob_refs().blob_ids();

        store.slow_put_for("complement");
        sync.save(&mut doc).await.unwrap();

        assert_eq!(store.deletes.load(Ordering::SeqCst), 2);
        for id in old {
            assert!(!store.exists("fs", &id).await.unwrap());
        }
        assert_eq!(store.inner.len(), 2);
    }

    #[tokio::test]
    async fn save_rejects_inline_copy_of_externalized_field() {
        let (store, sync) = memory_sync();
        let mut doc = Document::new().with_value(&field("complement"), json!({ "a": 1 }));
        doc.set("content", "inline text").unwrap();

        let err = sync.save(&mut doc).await.unwrap_err();
        assert!(matches!(err, SyncError::Inline { .. }));
        assert_eq!(err.field().map(FieldName::as_str), Some("content"));
        assert!(store.is_empty());
        assert!(doc.blob_refs().is_empty());
    }

    #[tokio::test]
    async fn put_failure_aborts_save_with_field_context() {
        let store = FaultyBlobStore::new();
        store.fail_put_for("complement");
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();

        let err = sync.save(&mut doc).await.unwrap_err();
        assert_eq!(err.field().map(FieldName::as_str), Some("complement"));
        assert!(matches!(
            err,
            SyncError::Store {
                source: StoreError::Unavailable(_),
                ..
            }
        ));
        assert!(!doc.blob_refs().contains(&field("complement")));
    }

    #[tokio::test]
    async fn late_success_is_discarded_after_failure() {
        let store = FaultyBlobStore::new();
        store.fail_put_for("complement");
        store.slow_put_for("content");
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();

        assert!(sync.save(&mut doc).await.is_err());
        assert!(doc.blob_refs().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(doc.blob_refs().is_empty());
    }

    #[tokio::test]
    async fn failed_put_keeps_old_reference_and_blob() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let old = doc.blob_refs().get(&field("content")).unwrap();

        store.fail_put_for("content");
        doc.set_field(&field("content"), Some(json!("never stored")));
        assert!(sync.save(&mut doc).await.is_err());

        assert_eq!(doc.blob_refs().get(&field("content")), Some(old));
        assert!(store.exists("fs", &old).await.unwrap());
    }

    #[tokio::test]
    async fn superseded_delete_failure_is_swallowed() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let old = doc.blob_refs().get(&field("content")).unwrap();

        store.fail_delete_of(old);
        doc.set_field(&field("content"), Some(json!("v2")));
        sync.save(&mut doc).await.unwrap();

        let new = doc.blob_refs().get(&field("content")).unwrap();
        assert_ne!(new, old);
        assert!(store.exists("fs", &old).await.unwrap());
        assert_eq!(sync.orphans(&doc).await.unwrap(), vec![old]);
    }

    // -----------------------------------------------------------------------
    // Retrieve
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn retrieve_populates_fresh_copy() {
        let (_store, sync) = memory_sync();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.persist(&doc).await.unwrap();

        let fresh = records.load(&doc.id()).await.unwrap().unwrap();
        assert_eq!(fresh.field(&field("content")), None);

        let fresh = sync.retrieved(fresh).await.unwrap();
        assert_eq!(fresh.field(&field("content")), Some(json!("anyFetch is cool")));
        assert_eq!(
            fresh.value(&field("complement")).unwrap()["some"]["complicated"]["stuff"],
            json!(true)
        );
        assert_eq!(fresh.get("name"), Some(&json!("huge.txt")));
        assert_eq!(fresh.blob_refs(), doc.blob_refs());
    }

    #[tokio::test]
    async fn retrieve_runs_field_gets_concurrently() {
        let store = BarrierBlobStore::new(2);
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.persist(&doc).await.unwrap();

        let fresh = records.load(&doc.id()).await.unwrap().unwrap();
        let fresh = tokio::time::timeout(Duration::from_secs(5), sync.retrieved(fresh))
            .await
            .expect("gets should run concurrently")
            .unwrap();
        assert_eq!(fresh.field(&field("content")), Some(json!("anyFetch is cool")));
    }

    #[tokio::test]
    async fn retrieve_leaves_unreferenced_fields_untouched() {
        let (_store, sync) = memory_sync();
        let mut doc = Document::new().with_value(&field("content"), "saved");
        sync.save(&mut doc).await.unwrap();

        doc.set_field(&field("complement"), Some(json!("never saved")));
        doc.set_field(&field("content"), Some(json!("edited, unsaved")));
        sync.retrieve(&mut doc).await.unwrap();

        assert_eq!(doc.field(&field("content")), Some(json!("saved")));
        assert_eq!(doc.field(&field("complement")), Some(json!("never saved")));
    }

    #[tokio::test]
    async fn retrieve_missing_blob_is_not_found() {
        let (store, sync) = memory_sync();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        let blob = doc.blob_refs().get(&field("content")).unwrap();
        store.delete("fs", &blob).await.unwrap();

        let before = doc.blob_refs().clone();
        let err = sync.retrieve(&mut doc).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.field().map(FieldName::as_str), Some("content"));
        assert_eq!(doc.blob_refs(), &before);
    }

    #[tokio::test]
    async fn retrieve_undecodable_blob_is_decode_error() {
        let store = Arc::new(InMemoryBlobStore::new());
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = Document::new();
        let bad = store
            .put(
                "fs",
                Bytes::from_static(b"{not json"),
                BlobMetadata::new(doc.id(), "content"),
            )
            .await
            .unwrap();
        doc.blob_refs_mut().set(&field("content"), Some(bad)).unwrap();

        let err = sync.retrieve(&mut doc).await.unwrap_err();
        assert!(matches!(err, SyncError::Decode { blob, .. } if blob == bad));
    }

    #[tokio::test]
    async fn retrieve_get_failure_aborts() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        store.fail_get_of(doc.blob_refs().get(&field("complement")).unwrap());

        let err = sync.retrieve(&mut doc).await.unwrap_err();
        assert_eq!(err.field().map(FieldName::as_str), Some("complement"));
    }

    // -----------------------------------------------------------------------
    // Unlink
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unlink_deletes_blobs_and_persists_cleared_map() {
        let (store, sync) = memory_sync();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.persist(&doc).await.unwrap();

        let mut fresh = records.load(&doc.id()).await.unwrap().unwrap();
        sync.unlink(&mut fresh, &records).await.unwrap();

        assert!(fresh.blob_refs().is_empty());
        assert!(store.is_empty());
        let reloaded = records.load(&doc.id()).await.unwrap().unwrap();
        assert!(reloaded.blob_refs().is_empty());

        sync.retrieve(&mut fresh).await.unwrap();
        assert_eq!(fresh.field(&field("content")), None);
        assert_eq!(fresh.field(&field("complement")), None);
    }

    #[tokio::test]
    async fn unlink_runs_field_deletes_concurrently() {
        let store = BarrierBlobStore::new(2);
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), sync.unlink(&mut doc, &records))
            .await
            .expect("deletes should run concurrently")
            .unwrap();
        assert!(doc.blob_refs().is_empty());
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn unlink_clears_in_memory_values_of_cleared_fields() {
        let (_store, sync) = memory_sync();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();

        sync.unlink(&mut doc, &records).await.unwrap();
        assert_eq!(doc.field(&field("content")), None);
        assert_eq!(doc.field(&field("complement")), None);
    }

    #[tokio::test]
    async fn unlink_without_references_still_persists() {
        let (_store, sync) = memory_sync();
        let records = FlakyRecordStore::default();
        let mut doc = Document::new();

        sync.unlink(&mut doc, &records).await.unwrap();
        assert_eq!(records.persists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unlink_treats_missing_blob_as_deleted() {
        let (store, sync) = memory_sync();
        let records = InMemoryRecordStore::<Document>::new();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        store.clear();

        sync.unlink(&mut doc, &records).await.unwrap();
        assert!(doc.blob_refs().is_empty());
    }

    #[tokio::test]
    async fn unlink_failure_persists_partial_progress() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let records = FlakyRecordStore::default();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.persist(&doc).await.unwrap();

        let stuck = doc.blob_refs().get(&field("complement")).unwrap();
        store.fail_delete_of(stuck);

        let err = sync.unlink(&mut doc, &records).await.unwrap_err();
        assert_eq!(err.field().map(FieldName::as_str), Some("complement"));

        // Whatever was cleared in memory is also what was persisted.
        let durable = records.inner.load(&doc.id()).await.unwrap().unwrap();
        assert_eq!(durable.blob_refs(), doc.blob_refs());
        assert_eq!(doc.blob_refs().get(&field("complement")), Some(stuck));

        // Retrying after the store recovers converges.
        store.heal();
        sync.unlink(&mut doc, &records).await.unwrap();
        assert!(doc.blob_refs().is_empty());
        assert!(store.inner.is_empty());
        let durable = records.inner.load(&doc.id()).await.unwrap().unwrap();
        assert!(durable.blob_refs().is_empty());
    }

    #[tokio::test]
    async fn unlink_persist_failure_is_reported() {
        let (store, sync) = memory_sync();
        let records = FlakyRecordStore::default();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        records.fail_persist.store(true, Ordering::SeqCst);

        let err = sync.unlink(&mut doc, &records).await.unwrap_err();
        assert!(matches!(err, SyncError::Persist(_)));
        assert!(err.field().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unlink_delete_error_wins_over_partial_persist_error() {
        let store = FaultyBlobStore::new();
        let sync = BlobSynchronizer::new(store.clone(), config()).unwrap();
        let records = FlakyRecordStore::default();
        let mut doc = huge_txt();
        sync.save(&mut doc).await.unwrap();
        store.fail_delete_of(doc.blob_refs().get(&field("content")).unwrap());
        records.fail_persist.store(true, Ordering::SeqCst);

        let err = sync.unlink(&mut doc, &records).await.unwrap_err();
        assert!(matches!(err, SyncError::Store { .. }));
    }

    // -----------------------------------------------------------------------
    // Orphans
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn orphans_ignore_other_records() {
        let (_store, sync) = memory_sync();
        let mut a = huge_txt();
        let mut b = huge_txt();
        sync.save(&mut a).await.unwrap();
        sync.save(&mut b).await.unwrap();

        assert!(sync.orphans(&a).await.unwrap().is_empty());
        assert!(sync.orphans(&b).await.unwrap().is_empty());
    }

    #[test]
    fn invalid_config_rejected() {
        let store = Arc::new(InMemoryBlobStore::new());
        let bad = SyncConfig::new(vec![]);
        assert!(matches!(
            BlobSynchronizer::new(store, bad),
            Err(SyncError::Config(_))
        ));
    }

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-zA-Z0-9 ]{0,24}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn save_then_retrieve_restores_any_value(content in json_value(), complement in json_value()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (_store, sync) = memory_sync();
                let records = InMemoryRecordStore::<Document>::new();
                let mut doc = Document::new()
                    .with_value(&field("content"), content.clone())
                    .with_value(&field("complement"), complement.clone());
                sync.save(&mut doc).await.unwrap();
                records.persist(&doc).await.unwrap();

                let fresh = records.load(&doc.id()).await.unwrap().unwrap();
                let fresh = sync.retrieved(fresh).await.unwrap();
                assert_eq!(fresh.field(&field("content")), Some(content));
                assert_eq!(fresh.field(&field("complement")), Some(complement));
            });
        }
    }
}
