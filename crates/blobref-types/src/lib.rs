//! Foundation types for blobref.
//!
//! This crate provides the identifiers shared by every other blobref crate.
//!
//! # Key Types
//!
//! - [`BlobId`] -- Opaque identifier of one stored blob (UUID v7)
//! - [`RecordId`] -- Stable identifier of a structured record (UUID v7)

pub mod error;
pub mod id;

pub use error::TypeError;
pub use id::{BlobId, RecordId};
