use std::path::{Path, PathBuf};

use blobref_store::DEFAULT_CONTENT_TYPE;
use blobref_sync::config::DEFAULT_BUCKET;
use blobref_sync::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Where blobs are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// One file per blob under `root`.
    Fs { root: PathBuf },
}

/// File-level configuration of a [`BlobRef`](crate::BlobRef).
///
/// ```toml
/// bucket = "attachments"
/// fields = ["content", "complement"]
///
/// [backend]
/// kind = "fs"
/// root = "/var/lib/blobref"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlobRefConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub fields: Vec<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

impl BlobRefConfig {
    /// In-memory configuration externalizing `fields` into the default bucket.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bucket: default_bucket(),
            fields: fields.into_iter().map(Into::into).collect(),
            content_type: default_content_type(),
            backend: BackendConfig::Memory,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.to_sync_config()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The synchronizer configuration this file describes.
    pub fn to_sync_config(&self) -> SdkResult<SyncConfig> {
        let config = SyncConfig::from_names(&self.fields)?
            .with_bucket(self.bucket.clone())
            .with_content_type(self.content_type.clone());
        config.validate()?;
        if let BackendConfig::Fs { root } = &self.backend {
            if root.as_os_str().is_empty() {
                return Err(SdkError::Config("fs backend root must not be empty".into()));
            }
        }
        Ok(config)
    }
}
