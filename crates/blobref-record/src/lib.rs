//! Structured records for blobref.
//!
//! The primary record store is a collaborator of the blob synchronizer: the
//! synchronizer reads and writes externalized fields and the reference map
//! through the [`Record`] trait, and asks a [`RecordStore`] to persist the
//! record after unlinking its blobs.
//!
//! - [`Record`] -- field access plus the embedded [`ReferenceMap`](blobref_refs::ReferenceMap)
//! - [`Document`] -- a schemaless record with plain JSON fields
//! - [`RecordStore`] -- async persistence interface
//! - [`InMemoryRecordStore`] -- stores serialized records in a `HashMap`

pub mod document;
pub mod error;
pub mod memory;
pub mod traits;

pub use document::{Document, ID_KEY, REF_MAP_KEY};
pub use error::{RecordError, RecordResult};
pub use memory::InMemoryRecordStore;
pub use traits::{Record, RecordStore};
