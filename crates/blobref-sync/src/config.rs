use blobref_refs::{parse_field_set, FieldName};
use blobref_store::DEFAULT_CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Bucket used when none is configured.
pub const DEFAULT_BUCKET: &str = "fs";

/// Which fields a synchronizer externalizes, and where their blobs go.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fields whose values are stored out-of-line, in processing order.
    pub field_names: Vec<FieldName>,
    /// Logical namespace within the blob store.
    pub bucket: String,
    /// Content type recorded on every blob written.
    pub content_type: String,
}

impl SyncConfig {
    /// Externalize `field_names` into the default bucket as JSON.
    pub fn new(field_names: Vec<FieldName>) -> Self {
        Self {
            field_names,
            bucket: DEFAULT_BUCKET.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Build from raw names, validating each and rejecting duplicates.
    pub fn from_names<I, S>(names: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = parse_field_set(names).map_err(|e| SyncError::Config(e.to_string()))?;
        let config = Self::new(fields);
        config.validate()?;
        Ok(config)
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Returns `true` if `field` is externalized by this configuration.
    pub fn externalizes(&self, field: &FieldName) -> bool {
        self.field_names.contains(field)
    }

    /// Check the configuration is usable.
    ///
    /// Rejects an empty field set, duplicate field names, and an empty
    /// bucket name.
    pub fn validate(&self) -> SyncResult<()> {
        if self.field_names.is_empty() {
            return Err(SyncError::Config("no externalized fields configured".into()));
        }
        for (i, field) in self.field_names.iter().enumerate() {
            if self.field_names[..i].contains(field) {
                return Err(SyncError::Config(format!("duplicate field name: {field}")));
            }
        }
        if self.bucket.trim().is_empty() {
            return Err(SyncError::Config("bucket name must not be empty".into()));
        }
        Ok(())
    }
}
