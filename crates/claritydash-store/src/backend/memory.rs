//! Process-local backend
//!
//! Holds records in maps behind reader/writer locks. Each lock is held only
//! for the duration of one backend call; `update_index` holds the index
//! map's write lock across its read and write.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::{Backend, IndexRecord};
use crate::errors::{lock_poisoned, Result};

type EntityMap = HashMap<(String, String), (u64, Value)>;

/// In-memory backend for tests and ephemeral stores
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entities: RwLock<EntityMap>,
    indexes: RwLock<HashMap<String, IndexRecord>>,
    next_seq: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn slot(entity_type: &str, key: &str) -> (String, String) {
    (entity_type.to_string(), key.to_string())
}

impl Backend for MemoryBackend {
    fn get_entity(&self, entity_type: &str, key: &str) -> Result<Option<Value>> {
        let entities = self
            .entities
            .read()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        Ok(entities
            .get(&slot(entity_type, key))
            .map(|(_, state)| state.clone()))
    }

    fn contains_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        let entities = self
            .entities
            .read()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        Ok(entities.contains_key(&slot(entity_type, key)))
    }

    fn insert_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        let slot = slot(entity_type, key);
        if entities.contains_key(&slot) {
            return Ok(false);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        entities.insert(slot, (seq, state.clone()));
        Ok(true)
    }

    fn update_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        match entities.get_mut(&slot(entity_type, key)) {
            Some((_, stored)) => {
                *stored = state.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        Ok(entities.remove(&slot(entity_type, key)).is_some())
    }

    fn entity_keys(&self, entity_type: &str) -> Result<Vec<String>> {
        let entities = self
            .entities
            .read()
            .map_err(|_| lock_poisoned("memory.entities"))?;
        let mut keys: Vec<(u64, String)> = entities
            .iter()
            .filter(|((t, _), _)| t == entity_type)
            .map(|((_, k), (seq, _))| (*seq, k.clone()))
            .collect();
        keys.sort();
        Ok(keys.into_iter().map(|(_, k)| k).collect())
    }

    fn load_index(&self, index_name: &str) -> Result<Option<IndexRecord>> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| lock_poisoned("memory.indexes"))?;
        Ok(indexes.get(index_name).cloned())
    }

    fn save_index(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| lock_poisoned("memory.indexes"))?;
        indexes.insert(index_name.to_string(), record.clone());
        Ok(())
    }

    fn update_index(
        &self,
        index_name: &str,
        f: &mut dyn FnMut(&mut IndexRecord),
    ) -> Result<bool> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| lock_poisoned("memory.indexes"))?;
        let before = indexes.get(index_name).cloned().unwrap_or_default();
        let mut record = before.clone();
        f(&mut record);
        if record == before {
            return Ok(false);
        }
        indexes.insert(index_name.to_string(), record);
        Ok(true)
    }
}
