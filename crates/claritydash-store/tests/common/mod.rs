// Shared fixtures for store integration tests
#![allow(dead_code)]

use claritydash_core::model::Entity;
use claritydash_store::backend::{Backend, IndexRecord, MemoryBackend};
use claritydash_store::errors::{storage_error, Result};
use claritydash_store::Storage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Minimal entity keyed by `slug`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub slug: String,
    pub title: String,
    pub body: String,
}

impl Note {
    pub fn new(slug: &str, title: &str, body: &str) -> Self {
        Self {
            slug: slug.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

impl Entity for Note {
    const ENTITY_TYPE: &'static str = "note";
    const INDEX_NAME: &'static str = "notes";
    const KEY_FIELD: &'static str = "slug";
}

/// Memory backend whose writes can be made to fail on demand
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_save_index: AtomicBool,
    fail_delete_entity: AtomicBool,
}

impl FlakyBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_save_index(&self, on: bool) {
        self.fail_save_index.store(on, Ordering::SeqCst);
    }

    pub fn fail_delete_entity(&self, on: bool) {
        self.fail_delete_entity.store(on, Ordering::SeqCst);
    }
}

impl Backend for FlakyBackend {
    fn get_entity(&self, entity_type: &str, key: &str) -> Result<Option<Value>> {
        self.inner.get_entity(entity_type, key)
    }

    fn contains_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        self.inner.contains_entity(entity_type, key)
    }

    fn insert_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        self.inner.insert_entity(entity_type, key, state)
    }

    fn update_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        self.inner.update_entity(entity_type, key, state)
    }

    fn delete_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        if self.fail_delete_entity.load(Ordering::SeqCst) {
            return Err(storage_error("delete_entity", "injected failure"));
        }
        self.inner.delete_entity(entity_type, key)
    }

    fn entity_keys(&self, entity_type: &str) -> Result<Vec<String>> {
        self.inner.entity_keys(entity_type)
    }

    fn load_index(&self, index_name: &str) -> Result<Option<IndexRecord>> {
        self.inner.load_index(index_name)
    }

    fn save_index(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        if self.fail_save_index.load(Ordering::SeqCst) {
            return Err(storage_error("save_index", "injected failure"));
        }
        self.inner.save_index(index_name, record)
    }

    fn update_index(
        &self,
        index_name: &str,
        f: &mut dyn FnMut(&mut IndexRecord),
    ) -> Result<bool> {
        if self.fail_save_index.load(Ordering::SeqCst) {
            return Err(storage_error("update_index", "injected failure"));
        }
        self.inner.update_index(index_name, f)
    }
}

/// Storage over a fresh flaky backend, plus a handle to flip its failures
pub fn flaky_storage() -> (Storage, Arc<FlakyBackend>) {
    let backend = FlakyBackend::new();
    (Storage::new(backend.clone()), backend)
}
