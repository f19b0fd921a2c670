//! Blob synchronization for externalized record fields.
//!
//! A [`BlobSynchronizer`] moves the values of a configured set of record
//! fields out to a blob store and keeps the record's reference map in step:
//!
//! - **Save** writes each set field to a fresh blob, repoints the reference
//!   map and discards the superseded blob on a best-effort basis.
//! - **Retrieve** fetches and decodes every referenced blob back into the
//!   record.
//! - **Unlink** deletes every referenced blob, clears the reference map and
//!   persists the record.
//!
//! Each operation fans out one unit of work per configured field and joins
//! them at a single point, failing on the first field error. Fields are
//! independent: there is no cross-field atomicity.
//!
//! The synchronizer can be called directly, or plugged into a
//! [`ManagedRecords`] lifecycle through [`BlobHook`] so saves and unlinks run
//! automatically before persist and delete.

pub mod config;
pub mod error;
pub mod hooks;
pub mod managed;
pub mod synchronizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use hooks::{BlobHook, LifecycleHook, NoOpHook};
pub use managed::ManagedRecords;
pub use synchronizer::BlobSynchronizer;
