use blobref_record::RecordError;
use blobref_store::StoreError;
use blobref_sync::SyncError;
use blobref_types::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot render configuration: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("record error: {0}")]
    Record(#[from] RecordError),
}

pub type SdkResult<T> = Result<T, SdkError>;
