use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;
use crate::model::key_policy::{self, EntityKey};

/// A uniquely keyed record type held by the entity store
///
/// The payload is a serde type at the call site and a JSON object on disk.
/// `KEY_FIELD` names the top-level field whose string value is the key; it
/// is fixed at creation and a patch may not change it.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity type name used to partition storage (e.g. "user")
    const ENTITY_TYPE: &'static str;

    /// Name of the index record enumerating this type (e.g. "users")
    const INDEX_NAME: &'static str;

    /// Top-level field the key is derived from
    const KEY_FIELD: &'static str;

    /// Derive this entity's key through the key policy
    fn derive_key(&self) -> Result<EntityKey> {
        key_policy::derive_key(self, Self::KEY_FIELD)
    }

    /// Baseline entities inserted once per entity type
    fn seed_data() -> Vec<Self> {
        Vec::new()
    }
}
