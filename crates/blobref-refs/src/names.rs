//! Field name validation.
//!
//! Valid field names:
//! - Must be non-empty and at most [`MAX_FIELD_NAME_LEN`] bytes
//! - Contain only ASCII letters, digits, `_` and `-`
//! - Must not start with `_` (reserved for internal record fields such as
//!   the reference map itself)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RefError, Result};

/// Longest accepted field name, in bytes.
pub const MAX_FIELD_NAME_LEN: usize = 128;

/// Validate a field name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use blobref_refs::names::validate_field_name;
///
/// assert!(validate_field_name("content").is_ok());
/// assert!(validate_field_name("raw-body_2").is_ok());
/// assert!(validate_field_name("").is_err());
/// assert!(validate_field_name("_blob_refs").is_err());
/// ```
pub fn validate_field_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidFieldName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("field name must not be empty".into()));
    }
    if name.len() > MAX_FIELD_NAME_LEN {
        return Err(invalid(format!(
            "longer than {MAX_FIELD_NAME_LEN} bytes"
        )));
    }
    if name.starts_with('_') {
        return Err(invalid("leading '_' is reserved".into()));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Validate a list of field names and reject duplicates, keeping order.
pub fn parse_field_set<I, S>(names: I) -> Result<Vec<FieldName>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut fields: Vec<FieldName> = Vec::new();
    for name in names {
        let field = FieldName::new(name)?;
        if fields.contains(&field) {
            return Err(RefError::DuplicateField {
                name: field.into(),
            });
        }
        fields.push(field);
    }
    Ok(fields)
}

/// A validated externalized field name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_field_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldName({})", self.0)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for FieldName {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for FieldName {
    type Error = RefError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FieldName> for String {
    fn from(value: FieldName) -> Self {
        value.0
    }
}
