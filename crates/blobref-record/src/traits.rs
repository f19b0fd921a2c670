use async_trait::async_trait;
use blobref_refs::{FieldName, ReferenceMap};
use blobref_types::RecordId;
use serde_json::Value;

use crate::error::RecordResult;

/// A structured record with externalized fields.
///
/// Externalized field values are held in memory only; what the primary
/// store persists for them is the reference map entry.
pub trait Record: Send + Sync {
    fn record_id(&self) -> RecordId;

    /// Current in-memory value of an externalized field, `None` when unset.
    fn field(&self, name: &FieldName) -> Option<Value>;

    /// Assign (`Some`) or unset (`None`) an externalized field.
    fn set_field(&mut self, name: &FieldName, value: Option<Value>);

    /// Whether a value named `name` is also kept inline with the record.
    ///
    /// Externalized fields must never be persisted inline; save refuses
    /// records for which this returns `true`.
    fn has_plain_field(&self, _name: &FieldName) -> bool {
        false
    }

    fn blob_refs(&self) -> &ReferenceMap;

    fn blob_refs_mut(&mut self) -> &mut ReferenceMap;
}

/// Persistence interface of the primary record store.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Durably save the record, replacing any previous version.
    async fn persist(&self, record: &R) -> RecordResult<()>;

    /// Load a fresh copy of a record. Returns `Ok(None)` if it does not exist.
    async fn load(&self, id: &RecordId) -> RecordResult<Option<R>>;

    /// Remove a record. Returns `true` if it existed.
    async fn remove(&self, id: &RecordId) -> RecordResult<bool>;
}
