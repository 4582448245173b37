//! Enumeration index for one entity type
//!
//! The index is a single record holding the insertion-ordered key set and
//! the seed marker. Mutations go through [`Backend::update_index`], which
//! makes each read-modify-write atomic across every handle on the store.
//! Inside one process they also queue on the index's own mutex, independent
//! of the per-key mutexes of the entity store.

use claritydash_core::errors::{ExError, ExErrorKind};
use claritydash_core::model::EntityKey;
use std::sync::Arc;

use crate::backend::{Backend, IndexRecord};
use crate::errors::{corrupt_record, Result};
use crate::locks::KeyLocks;

pub(crate) type IndexLocks = KeyLocks<&'static str>;

/// Key membership (and seed marker) for one entity type
#[derive(Clone)]
pub struct EntityIndex {
    name: &'static str,
    backend: Arc<dyn Backend>,
    locks: Arc<IndexLocks>,
}

impl EntityIndex {
    pub(crate) fn new(name: &'static str, backend: Arc<dyn Backend>, locks: Arc<IndexLocks>) -> Self {
        Self {
            name,
            backend,
            locks,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add `key`; adding a present key is a no-op
    ///
    /// Returns whether the key was newly added.
    pub(crate) fn add(&self, key: &EntityKey) -> Result<bool> {
        self.update(|record| record.insert(key.as_str()))
    }

    /// Remove `key`; removing an absent key is a no-op
    ///
    /// Returns whether the key was present.
    pub(crate) fn remove(&self, key: &EntityKey) -> Result<bool> {
        self.update(|record| record.remove(key.as_str()))
    }

    /// Snapshot of the indexed keys in insertion order
    pub fn list(&self) -> Result<Vec<EntityKey>> {
        self.snapshot()?
            .keys
            .into_iter()
            .map(|key| {
                EntityKey::parse(key.clone()).map_err(|e| corrupt_record(self.name, &key, e))
            })
            .collect()
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.snapshot()?.keys.len())
    }

    pub fn contains(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.snapshot()?.contains(key.as_str()))
    }

    /// Whether the seed marker is set
    pub fn is_seeded(&self) -> Result<bool> {
        Ok(self.snapshot()?.seeded)
    }

    /// Set the seed marker
    pub(crate) fn mark_seeded(&self) -> Result<()> {
        self.update(|record| record.seeded = true)
    }

    fn snapshot(&self) -> Result<IndexRecord> {
        Ok(self.backend.load_index(self.name)?.unwrap_or_default())
    }

    /// Read-modify-write the index record as one backend transaction
    ///
    /// The record is written back only if `f` changed it.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut IndexRecord) -> R) -> Result<R> {
        self.locks.with_lock(&self.name, || {
            let mut f = Some(f);
            let mut out = None;
            let mut after = (0, false);
            let mut apply = |record: &mut IndexRecord| {
                if let Some(f) = f.take() {
                    out = Some(f(record));
                    after = (record.keys.len(), record.seeded);
                }
            };
            let changed = self.backend.update_index(self.name, &mut apply)?;
            if changed {
                tracing::debug!(
                    index = self.name,
                    key_count = after.0,
                    seeded = after.1,
                    "index updated"
                );
            }
            out.ok_or_else(|| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("index_update")
                    .with_message(format!("backend skipped the update of index {}", self.name))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn index() -> EntityIndex {
        EntityIndex::new(
            "widgets",
            Arc::new(MemoryBackend::new()),
            Arc::new(KeyLocks::new("index")),
        )
    }

    fn key(raw: &str) -> EntityKey {
        EntityKey::parse(raw).unwrap()
    }

    #[test]
    fn test_empty_index() {
        let index = index();
        assert_eq!(index.count().unwrap(), 0);
        assert!(index.list().unwrap().is_empty());
        assert!(!index.is_seeded().unwrap());
    }

    #[test]
    fn test_add_is_idempotent_and_ordered() {
        let index = index();
        assert!(index.add(&key("b")).unwrap());
        assert!(index.add(&key("a")).unwrap());
        assert!(!index.add(&key("b")).unwrap());

        assert_eq!(index.list().unwrap(), vec![key("b"), key("a")]);
        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let index = index();
        index.add(&key("a")).unwrap();
        assert!(index.remove(&key("a")).unwrap());
        assert!(!index.remove(&key("a")).unwrap());
        assert!(!index.contains(&key("a")).unwrap());
    }

    #[test]
    fn test_seed_marker_survives_membership_changes() {
        let index = index();
        index.mark_seeded().unwrap();
        index.add(&key("a")).unwrap();
        index.remove(&key("a")).unwrap();
        assert!(index.is_seeded().unwrap());
    }
}
