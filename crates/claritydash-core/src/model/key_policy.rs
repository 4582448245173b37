//! Key policy: derivation and validation of entity keys
//!
//! A key is the verbatim string value of the entity's key field. The store
//! does no case-folding or trimming; callers that want normalized keys
//! (e.g. lower-cased emails) must normalize before deriving.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::{Result, StoreError};

/// A validated, immutable entity key
///
/// Only constructible through [`EntityKey::parse`] or [`derive_key`], so any
/// `EntityKey` in hand has already passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityKey(String);

impl EntityKey {
    /// Validate a raw key and wrap it
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is empty.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityKey {
    type Error = StoreError;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        if raw.is_empty() {
            return Err(empty_key());
        }
        Ok(Self(raw))
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.0
    }
}

/// Validate a raw key string
///
/// # Errors
///
/// Returns `InvalidKey` if the key is empty.
pub fn validate(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(empty_key().into());
    }
    Ok(())
}

/// Validate a loosely-typed key value (as found in a JSON payload)
///
/// # Errors
///
/// Returns `InvalidKey` if the value is not a string or is empty.
pub fn key_from_value(value: &Value) -> Result<EntityKey> {
    match value {
        Value::String(s) => EntityKey::parse(s.clone()),
        other => Err(StoreError::InvalidKey {
            reason: format!("key must be a string, got {}", json_type_name(other)),
        }
        .into()),
    }
}

/// Derive the key of `state` from its top-level `field`
///
/// # Errors
///
/// Returns `InvalidKey` if the state is not an object, lacks the field, or
/// the field is not a non-empty string.
pub fn derive_key<T: Serialize + ?Sized>(state: &T, field: &str) -> Result<EntityKey> {
    let value = serde_json::to_value(state).map_err(|e| StoreError::InvalidKey {
        reason: format!("state is not serializable: {}", e),
    })?;

    let field_value = value
        .as_object()
        .and_then(|obj| obj.get(field))
        .ok_or_else(|| StoreError::InvalidKey {
            reason: format!("key field '{}' is missing", field),
        })?;

    key_from_value(field_value)
}

fn empty_key() -> StoreError {
    StoreError::InvalidKey {
        reason: "key must not be empty".to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
