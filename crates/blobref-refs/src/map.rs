//! The per-record reference map.
//!
//! Each externalized field either has no entry (never saved, or unlinked) or
//! exactly one entry naming the blob that holds its current value. Saving a
//! field always writes a fresh blob, so two live entries never share a blob;
//! [`ReferenceMap::set`] enforces that.

use std::collections::BTreeMap;

use blobref_types::BlobId;
use serde::{Deserialize, Serialize};

use crate::error::{RefError, Result};
use crate::names::FieldName;

/// Typed view of the field-name -> blob mapping stored inside a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceMap {
    entries: BTreeMap<FieldName, BlobId>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The blob currently holding `field`'s value, if any.
    pub fn get(&self, field: &FieldName) -> Option<BlobId> {
        self.entries.get(field).copied()
    }

    /// Point `field` at `blob`, or clear it with `None`.
    ///
    /// Returns the previous entry. Fails without modifying the map if a
    /// different field already points at `blob`.
    pub fn set(&mut self, field: &FieldName, blob: Option<BlobId>) -> Result<Option<BlobId>> {
        match blob {
            Some(id) => {
                if let Some(owner) = self.field_for(&id) {
                    if owner != field {
                        return Err(RefError::BlobAlreadyReferenced {
                            blob: id,
                            field: owner.to_string(),
                        });
                    }
                }
                Ok(self.entries.insert(field.clone(), id))
            }
            None => Ok(self.entries.remove(field)),
        }
    }

    /// Remove `field`'s entry, returning the blob it pointed at.
    pub fn clear(&mut self, field: &FieldName) -> Option<BlobId> {
        self.entries.remove(field)
    }

    /// Returns `true` if `field` has an entry.
    pub fn contains(&self, field: &FieldName) -> bool {
        self.entries.contains_key(field)
    }

    /// The field whose entry points at `blob`, if any.
    pub fn field_for(&self, blob: &BlobId) -> Option<&FieldName> {
        self.entries
            .iter()
            .find_map(|(field, id)| (id == blob).then_some(field))
    }

    /// Entries in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &BlobId)> {
        self.entries.iter()
    }

    /// All referenced blob IDs.
    pub fn blob_ids(&self) -> Vec<BlobId> {
        self.entries.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
