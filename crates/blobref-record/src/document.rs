use std::collections::BTreeMap;

use blobref_refs::{FieldName, ReferenceMap};
use blobref_types::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RecordError, RecordResult};
use crate::traits::Record;

/// Serialized key of the record identifier.
pub const ID_KEY: &str = "_id";
/// Serialized key of the embedded reference map.
pub const REF_MAP_KEY: &str = "_blob_refs";

/// A schemaless record.
///
/// Plain fields are persisted inline. Externalized field values are never
/// serialized with the document; only their reference map entries are.
/// Keys starting with `_` are reserved for the document itself.
///
/// A name is either plain or externalized, never both: `set` refuses a name
/// that has an externalized value or reference, and assigning an
/// externalized value drops any plain field of the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    id: RecordId,
    #[serde(rename = "_blob_refs", default)]
    blob_refs: ReferenceMap,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
    #[serde(skip)]
    externalized: BTreeMap<FieldName, Value>,
}

impl Document {
    /// A new empty document with a fresh identifier.
    pub fn new() -> Self {
        Self::with_id(RecordId::new())
    }

    pub fn with_id(id: RecordId) -> Self {
        Self {
            id,
            blob_refs: ReferenceMap::new(),
            fields: BTreeMap::new(),
            externalized: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Read a plain (inline) field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a plain (inline) field, returning its previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> RecordResult<Option<Value>> {
        let name = name.into();
        if name.starts_with('_') {
            return Err(RecordError::ReservedField(name));
        }
        if self.is_externalized(&name) {
            return Err(RecordError::ExternalizedField(name));
        }
        Ok(self.fields.insert(name, value.into()))
    }

    fn is_externalized(&self, name: &str) -> bool {
        match FieldName::new(name) {
            Ok(field) => self.externalized.contains_key(&field) || self.blob_refs.contains(&field),
            Err(_) => false,
        }
    }

    /// Remove a plain field.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Borrow an externalized field's in-memory value.
    pub fn value(&self, name: &FieldName) -> Option<&Value> {
        self.externalized.get(name)
    }

    /// Builder-style assignment of an externalized field.
    pub fn with_value(mut self, name: &FieldName, value: impl Into<Value>) -> Self {
        self.set_field(name, Some(value.into()));
        self
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for Document {
    fn record_id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &FieldName) -> Option<Value> {
        self.externalized.get(name).cloned()
    }

    fn set_field(&mut self, name: &FieldName, value: Option<Value>) {
        match value {
            Some(v) => {
                self.fields.remove(name.as_str());
                self.externalized.insert(name.clone(), v);
            }
            None => {
                self.externalized.remove(name);
            }
        }
    }

    fn has_plain_field(&self, name: &FieldName) -> bool {
        self.fields.contains_key(name.as_str())
    }

    fn blob_refs(&self) -> &ReferenceMap {
        &self.blob_refs
    }

    fn blob_refs_mut(&mut self) -> &mut ReferenceMap {
        &mut self.blob_refs
    }
}
