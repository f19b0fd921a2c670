//! High-level SDK for blobref.
//!
//! [`BlobRef`] wires a blob store backend, an in-memory record store and a
//! [`BlobSynchronizer`] together from a [`BlobRefConfig`], so documents can
//! be saved with their large fields externalized, fetched back whole, and
//! removed together with their blobs.

pub mod client;
pub mod config;
pub mod error;

pub use client::{describe_refs, BlobRef};
pub use config::{BackendConfig, BlobRefConfig};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use blobref_record::{Document, Record};
pub use blobref_refs::FieldName;
pub use blobref_sync::{BlobSynchronizer, SyncConfig};
pub use blobref_types::{BlobId, RecordId};
