//! Durable key/value seam under the entity store and index
//!
//! A backend stores two kinds of records:
//! - entity records, one JSON object per `(entity_type, key)`
//! - index records, one [`IndexRecord`] per index name
//!
//! Each call is atomic on its own. Cross-call ordering (per-key
//! serialization) is the caller's job. Backends guarantee that
//! `insert_entity` is a single check-and-set and that `update_index` is a
//! single read-modify-write, even against other handles on the same store.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Membership record for one entity type
///
/// `keys` is kept in insertion order. `seeded` is the seed-completion marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub keys: Vec<String>,
    #[serde(default)]
    pub seeded: bool,
}

impl IndexRecord {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Append `key` unless present; returns whether it was added
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    /// Drop `key` if present; returns whether it was removed
    pub fn remove(&mut self, key: &str) -> bool {
        self.take(key).is_some()
    }

    /// Drop `key` if present; returns the position it held
    pub fn take(&mut self, key: &str) -> Option<usize> {
        let position = self.keys.iter().position(|k| k == key)?;
        self.keys.remove(position);
        Some(position)
    }

    /// Put `key` back at `position` (clamped) unless present
    pub fn insert_at(&mut self, position: usize, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        let position = position.min(self.keys.len());
        self.keys.insert(position, key.to_string());
        true
    }
}

/// Storage operations the entity store is built on
pub trait Backend: Send + Sync {
    /// Fetch the stored state for a key
    fn get_entity(&self, entity_type: &str, key: &str) -> Result<Option<Value>>;

    /// Whether a state is stored for a key
    fn contains_entity(&self, entity_type: &str, key: &str) -> Result<bool>;

    /// Store `state` if no state exists for the key; returns false if one did
    fn insert_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool>;

    /// Replace the stored state; returns false if no state existed
    fn update_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool>;

    /// Remove the stored state; returns false if no state existed
    fn delete_entity(&self, entity_type: &str, key: &str) -> Result<bool>;

    /// Every stored key of a type, oldest first
    fn entity_keys(&self, entity_type: &str) -> Result<Vec<String>>;

    /// Fetch an index record
    fn load_index(&self, index_name: &str) -> Result<Option<IndexRecord>>;

    /// Replace an index record
    fn save_index(&self, index_name: &str, record: &IndexRecord) -> Result<()>;

    /// Apply `f` to an index record (default if none) as one atomic step
    ///
    /// The record is written back only if `f` changed it; returns whether it
    /// did. No other update to the same record, from this handle or another
    /// one on the same store, can land between the read and the write.
    fn update_index(
        &self,
        index_name: &str,
        f: &mut dyn FnMut(&mut IndexRecord),
    ) -> Result<bool>;
}
