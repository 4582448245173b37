//! Entity store and index combined
//!
//! `IndexedStore<T>` is the call surface request handlers use. It sequences
//! the two separately serialized resources:
//!
//! - create: store the record, then add the key to the index
//! - delete: remove the key from the index, then delete the record
//!
//! Both run while holding the key's mutex. If the second step fails the
//! first is undone and the operation reports `StorageFailure`; if the undo
//! fails too, the drift is left for [`IndexedStore::reconcile`], which
//! `ensure_seed` runs on every call.
//!
//! ## Logging Ownership
//!
//! This layer owns lifecycle logging: `log_op_start!` at entry,
//! `log_op_end!` on success, `log_op_error!` on failure. Lower layers use
//! only `tracing::debug!`/`warn!`.

use claritydash_core::errors::{ExError, ExErrorKind, StoreError};
use claritydash_core::model::{Entity, EntityKey};
use claritydash_core::{log_op_end, log_op_error, log_op_start};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::entity_store::EntityStore;
use crate::errors::Result;
use crate::index::{EntityIndex, IndexLocks};

/// Indexed, per-key-serialized store for entity type `T`
pub struct IndexedStore<T: Entity> {
    pub(crate) entities: EntityStore<T>,
    pub(crate) index: EntityIndex,
    pub(crate) seed_locks: Arc<IndexLocks>,
}

impl<T: Entity> Clone for IndexedStore<T> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            index: self.index.clone(),
            seed_locks: self.seed_locks.clone(),
        }
    }
}

impl<T: Entity> IndexedStore<T> {
    pub(crate) fn new(
        entities: EntityStore<T>,
        index: EntityIndex,
        seed_locks: Arc<IndexLocks>,
    ) -> Self {
        Self {
            entities,
            index,
            seed_locks,
        }
    }

    /// The enumeration index underneath
    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    /// Whether an entity is stored under `key`
    pub fn exists(&self, key: &EntityKey) -> Result<bool> {
        self.observe_key("entity_exists", key, || self.entities.exists(key))
    }

    /// Read the entity stored under `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if no entity is stored under `key`.
    pub fn read(&self, key: &EntityKey) -> Result<T> {
        self.observe_key("entity_read", key, || self.entities.read(key))
    }

    /// Create an entity under `key` and index it
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the key is taken; `StorageFailure` if either step
    /// fails (the record is rolled back when the index step fails).
    pub fn create(&self, key: &EntityKey, state: &T) -> Result<T> {
        self.observe_key("entity_create", key, || self.create_indexed(key, state))
    }

    /// Create an entity under the key derived from its own state
    ///
    /// # Errors
    ///
    /// `InvalidKey` if no valid key can be derived; otherwise as [`Self::create`].
    pub fn insert(&self, state: &T) -> Result<T> {
        let key = state.derive_key()?;
        self.create(&key, state)
    }

    /// Shallow-merge `partial` into the entity under `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if no entity is stored; `InvalidInput` for a malformed patch.
    pub fn patch<P: Serialize + ?Sized>(&self, key: &EntityKey, partial: &P) -> Result<T> {
        self.observe_key("entity_patch", key, || self.entities.patch(key, partial))
    }

    /// Remove the entity under `key` from the index and the store
    ///
    /// # Errors
    ///
    /// `NotFound` if no entity is stored; `StorageFailure` if either step
    /// fails (the index entry is restored when the store step fails).
    pub fn delete(&self, key: &EntityKey) -> Result<()> {
        self.observe_key("entity_delete", key, || self.delete_indexed(key))
    }

    /// Indexed keys in insertion order
    pub fn list(&self) -> Result<Vec<EntityKey>> {
        self.observe_type("entity_list", || self.index.list())
    }

    /// Every indexed entity, in index order
    ///
    /// A key deleted between the index snapshot and its read is skipped.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if a key is still indexed but has no stored record.
    pub fn list_entities(&self) -> Result<Vec<T>> {
        self.observe_type("entity_list_entities", || {
            let mut out = Vec::new();
            for key in self.index.list()? {
                match self.entities.read(&key) {
                    Ok(entity) => out.push(entity),
                    Err(e) if e.kind() == ExErrorKind::NotFound => {
                        if let Some(entity) = self.recheck_missing(&key)? {
                            out.push(entity);
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(out)
        })
    }

    /// Settle a listed key whose read found no record
    ///
    /// Under the key mutex no create or delete is mid-flight, so a key that
    /// is still indexed without a record is drift, not a race.
    fn recheck_missing(&self, key: &EntityKey) -> Result<Option<T>> {
        self.entities.locked(key, || {
            if self.entities.exists(key)? {
                return self.entities.read(key).map(Some);
            }
            if self.index.contains(key)? {
                return Err(StoreError::IndexDrift {
                    entity_type: T::ENTITY_TYPE.to_string(),
                    message: format!("indexed but not stored: [{}]", key),
                }
                .into());
            }
            tracing::debug!(
                entity_type = T::ENTITY_TYPE,
                entity_key = %key,
                "indexed entity deleted before read"
            );
            Ok(None)
        })
    }

    /// Number of indexed keys
    pub fn count(&self) -> Result<usize> {
        self.observe_type("entity_count", || self.index.count())
    }

    /// Combined create; the caller need not hold the key mutex
    pub(crate) fn create_indexed(&self, key: &EntityKey, state: &T) -> Result<T> {
        self.entities.locked(key, || {
            let created = self.entities.create_unlocked(key, state)?;
            if let Err(index_err) = self.index.add(key) {
                return Err(self.roll_back_create(key, index_err));
            }
            Ok(created)
        })
    }

    fn roll_back_create(&self, key: &EntityKey, index_err: ExError) -> ExError {
        let failure = ExError::new(ExErrorKind::StorageFailure)
            .with_op("entity_create")
            .with_entity_type(T::ENTITY_TYPE)
            .with_key(key.as_str());

        match self.entities.delete_unlocked(key) {
            Ok(()) => {
                tracing::warn!(
                    entity_type = T::ENTITY_TYPE,
                    entity_key = %key,
                    "index update failed; create rolled back"
                );
                failure
                    .with_message("index update failed; create rolled back")
                    .with_source(index_err)
            }
            Err(rollback_err) => {
                tracing::error!(
                    entity_type = T::ENTITY_TYPE,
                    entity_key = %key,
                    index_error = %index_err,
                    rollback_error = %rollback_err,
                    "create rollback failed; record left for reconciliation"
                );
                failure
                    .with_message(format!(
                        "index update failed ({}); rollback failed, record left for reconciliation",
                        index_err
                    ))
                    .with_source(rollback_err)
            }
        }
    }

    fn delete_indexed(&self, key: &EntityKey) -> Result<()> {
        self.entities.locked(key, || {
            if !self.entities.exists(key)? {
                return Err(StoreError::NotFound {
                    entity_type: T::ENTITY_TYPE.to_string(),
                    key: key.to_string(),
                }
                .into());
            }

            let position = self.index.update(|record| record.take(key.as_str()))?;

            match self.entities.delete_unlocked(key) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ExErrorKind::NotFound => Err(e),
                Err(store_err) => Err(self.restore_index_entry(key, position, store_err)),
            }
        })
    }

    /// Put a removed index entry back where it was
    fn restore_index_entry(
        &self,
        key: &EntityKey,
        position: Option<usize>,
        store_err: ExError,
    ) -> ExError {
        let failure = ExError::new(ExErrorKind::StorageFailure)
            .with_op("entity_delete")
            .with_entity_type(T::ENTITY_TYPE)
            .with_key(key.as_str());

        let restored = self.index.update(|record| match position {
            Some(position) => record.insert_at(position, key.as_str()),
            None => false,
        });
        match restored {
            Ok(_) => failure
                .with_message("record delete failed; index entry restored")
                .with_source(store_err),
            Err(restore_err) => {
                tracing::error!(
                    entity_type = T::ENTITY_TYPE,
                    entity_key = %key,
                    store_error = %store_err,
                    restore_error = %restore_err,
                    "index restore failed; entry left for reconciliation"
                );
                failure
                    .with_message(format!(
                        "record delete failed ({}); index restore failed, entry left for reconciliation",
                        store_err
                    ))
                    .with_source(restore_err)
            }
        }
    }

    pub(crate) fn observe_key<R>(
        &self,
        op: &'static str,
        key: &EntityKey,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        log_op_start!(op, entity = T, key = key);
        let start = Instant::now();

        let result = f();
        match &result {
            Ok(_) => {
                log_op_end!(op, since = start, entity = T, key = key);
            }
            Err(e) => {
                log_op_error!(op, e.clone(), since = start, entity = T, key = key);
            }
        }
        result
    }

    pub(crate) fn observe_type<R>(
        &self,
        op: &'static str,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        log_op_start!(op, entity = T);
        let start = Instant::now();

        let result = f();
        match &result {
            Ok(_) => {
                log_op_end!(op, since = start, entity = T);
            }
            Err(e) => {
                log_op_error!(op, e.clone(), since = start, entity = T);
            }
        }
        result
    }
}
