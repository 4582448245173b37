//! Shared storage handle
//!
//! `Storage` bundles a backend with the lock registries that serialize work
//! on it. Every `IndexedStore` handed out by one `Storage` shares those
//! registries, so two handles for the same entity type still serialize on
//! the same per-key and per-index mutexes.

use claritydash_core::model::Entity;
use std::sync::Arc;

use crate::backend::{Backend, MemoryBackend, SqliteBackend};
use crate::config::StoreConfig;
use crate::entity_store::{EntityLocks, EntityStore};
use crate::errors::Result;
use crate::index::{EntityIndex, IndexLocks};
use crate::indexed::IndexedStore;
use crate::locks::KeyLocks;

/// Backend plus lock registries, cheap to clone
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn Backend>,
    entity_locks: Arc<EntityLocks>,
    index_locks: Arc<IndexLocks>,
    seed_locks: Arc<IndexLocks>,
}

impl Storage {
    /// Wrap an existing backend
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            entity_locks: Arc::new(KeyLocks::new("entity")),
            index_locks: Arc::new(KeyLocks::new("index")),
            seed_locks: Arc::new(KeyLocks::new("seed")),
        }
    }

    /// Open a SQLite-backed store as described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteBackend::open(config)?)))
    }

    /// A process-local store with nothing persisted
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Indexed store for entity type `T`
    pub fn entities<T: Entity>(&self) -> IndexedStore<T> {
        IndexedStore::new(
            EntityStore::new(self.backend.clone(), self.entity_locks.clone()),
            EntityIndex::new(T::INDEX_NAME, self.backend.clone(), self.index_locks.clone()),
            self.seed_locks.clone(),
        )
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}
