//! Reference maps for blobref.
//!
//! A record keeps one [`ReferenceMap`] recording, for each externalized
//! field, the blob currently holding that field's value. The map is part of
//! the record's own persisted state; the blobs themselves live in a
//! blob store.
//!
//! # Modules
//!
//! - [`error`] -- Error types for field name and reference map operations
//! - [`names`] -- Field name validation and the [`FieldName`] newtype
//! - [`map`] -- The [`ReferenceMap`] accessor

pub mod error;
pub mod map;
pub mod names;

pub use error::{RefError, Result};
pub use map::ReferenceMap;
pub use names::{parse_field_set, validate_field_name, FieldName};
