use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use blobref_types::BlobId;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{check_bucket, StoreError, StoreResult};
use crate::object::{BlobMetadata, StoredBlob};
use crate::traits::BlobStore;

const DATA_EXT: &str = "blob";
const META_EXT: &str = "meta.json";

/// Filesystem-backed blob store.
///
/// Layout under the root directory:
///
/// ```text
/// <root>/<bucket>/<blob-id>.blob        raw bytes
/// <root>/<bucket>/<blob-id>.meta.json   BlobMetadata as JSON
/// ```
///
/// The data file is the source of truth for existence; a sidecar without a
/// data file is ignored by `list` and reported as missing by `get_blob`.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn data_path(&self, bucket: &str, id: &BlobId) -> PathBuf {
        self.bucket_dir(bucket).join(format!("{id}.{DATA_EXT}"))
    }

    fn meta_path(&self, bucket: &str, id: &BlobId) -> PathBuf {
        self.bucket_dir(bucket).join(format!("{id}.{META_EXT}"))
    }
}

fn not_found_as(id: &BlobId, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(*id)
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bucket: &str, data: Bytes, metadata: BlobMetadata) -> StoreResult<BlobId> {
        check_bucket(bucket)?;
        tokio::fs::create_dir_all(self.bucket_dir(bucket)).await?;

        let id = BlobId::new();
        let meta_json =
            serde_json::to_vec_pretty(&metadata).map_err(|e| StoreError::Metadata(e.to_string()))?;
        // Sidecar first so a visible data file always has its metadata.
        tokio::fs::write(self.meta_path(bucket, &id), meta_json).await?;
        tokio::fs::write(self.data_path(bucket, &id), &data).await?;

        debug!(bucket, blob = %id, size = data.len(), "wrote blob file");
        Ok(id)
    }

    async fn get_blob(&self, bucket: &str, id: &BlobId) -> StoreResult<StoredBlob> {
        check_bucket(bucket)?;
        let data = tokio::fs::read(self.data_path(bucket, id))
            .await
            .map_err(|e| not_found_as(id, e))?;
        let meta_raw = tokio::fs::read(self.meta_path(bucket, id))
            .await
            .map_err(|e| not_found_as(id, e))?;
        let metadata: BlobMetadata =
            serde_json::from_slice(&meta_raw).map_err(|e| StoreError::Metadata(e.to_string()))?;
        Ok(StoredBlob::new(*id, Bytes::from(data), metadata))
    }

    async fn get(&self, bucket: &str, id: &BlobId) -> StoreResult<Bytes> {
        check_bucket(bucket)?;
        let data = tokio::fs::read(self.data_path(bucket, id))
            .await
            .map_err(|e| not_found_as(id, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, bucket: &str, id: &BlobId) -> StoreResult<bool> {
        check_bucket(bucket)?;
        let existed = match tokio::fs::remove_file(self.data_path(bucket, id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = tokio::fs::remove_file(self.meta_path(bucket, id)).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(bucket, blob = %id, error = %e, "failed to remove metadata sidecar");
            }
        }
        Ok(existed)
    }

    async fn list(&self, bucket: &str) -> StoreResult<Vec<BlobId>> {
        check_bucket(bucket)?;
        let mut entries = match tokio::fs::read_dir(self.bucket_dir(bucket)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{DATA_EXT}");
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(&suffix)) else {
                continue;
            };
            match BlobId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(bucket, file = stem, error = %e, "skipping unrecognized blob file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
