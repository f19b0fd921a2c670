//! Blob storage for blobref.
//!
//! A blob store holds opaque byte objects, each identified by a freshly minted
//! [`BlobId`](blobref_types::BlobId) and tagged with [`BlobMetadata`] naming
//! the record and field it was written for. Objects live inside a named
//! bucket, a logical namespace within the store.
//!
//! # Storage Backends
//!
//! All backends implement the async [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per blob plus a JSON metadata sidecar
//!
//! # Design Rules
//!
//! 1. `put` never overwrites: every call creates a new object with a new ID.
//! 2. Metadata is for audit and diagnostics, never for lookup.
//! 3. Deleting an unknown ID is not an error; it reports `false`.
//! 4. The store never interprets blob contents.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use object::{BlobMetadata, StoredBlob, DEFAULT_CONTENT_TYPE};
pub use traits::BlobStore;
