//! Per-key entity records
//!
//! `EntityStore<T>` owns the stored state of each entity of type `T`. Every
//! operation on a key runs under that key's mutex, so creates and patches on
//! one key never interleave, while different keys proceed independently.

use claritydash_core::errors::{ExError, ExErrorKind, StoreError};
use claritydash_core::model::{key_policy, Entity, EntityKey};
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::backend::Backend;
use crate::errors::{corrupt_record, Result};
use crate::locks::KeyLocks;

pub(crate) type EntityLocks = KeyLocks<(&'static str, String)>;

/// Durable per-key state for one entity type
///
/// Writes here do not touch the enumeration index. Callers reach it only
/// through [`crate::IndexedStore`], which keeps the two in step.
pub struct EntityStore<T: Entity> {
    backend: Arc<dyn Backend>,
    locks: Arc<EntityLocks>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            locks: self.locks.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub(crate) fn new(backend: Arc<dyn Backend>, locks: Arc<EntityLocks>) -> Self {
        Self {
            backend,
            locks,
            _entity: PhantomData,
        }
    }

    /// Whether a state is stored for `key`
    pub fn exists(&self, key: &EntityKey) -> Result<bool> {
        self.backend.contains_entity(T::ENTITY_TYPE, key.as_str())
    }

    /// Read the stored state for `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored; `Serialization` if the stored blob no
    /// longer decodes as `T`.
    pub fn read(&self, key: &EntityKey) -> Result<T> {
        let value = self.load(key)?.ok_or_else(|| not_found::<T>(key))?;
        decode::<T>(key, value)
    }

    /// Store `state` under `key` if nothing is stored there yet
    ///
    /// Returns the state unchanged.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the key has state; `InvalidInput` if the state's key
    /// field does not match `key`.
    pub fn create(&self, key: &EntityKey, state: &T) -> Result<T> {
        self.locked(key, || self.create_unlocked(key, state))
    }

    /// Shallow-merge `partial` into the stored state
    ///
    /// Top-level fields present in `partial` replace the stored ones; absent
    /// fields are kept. Returns the full merged state.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored; `InvalidInput` if `partial` is not an
    /// object, changes the key field, or leaves a state that is not a valid
    /// `T`. The stored state is untouched on error.
    pub fn patch<P: Serialize + ?Sized>(&self, key: &EntityKey, partial: &P) -> Result<T> {
        self.locked(key, || self.patch_unlocked(key, partial))
    }

    /// Remove the stored state for `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored.
    pub fn delete(&self, key: &EntityKey) -> Result<()> {
        self.locked(key, || self.delete_unlocked(key))
    }

    /// Every stored key, oldest first
    pub fn keys(&self) -> Result<Vec<EntityKey>> {
        self.backend
            .entity_keys(T::ENTITY_TYPE)?
            .into_iter()
            .map(EntityKey::parse)
            .collect()
    }

    /// Run `f` while holding the mutex for `key`
    pub(crate) fn locked<R>(&self, key: &EntityKey, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.locks.with_lock(&(T::ENTITY_TYPE, key.as_str().to_string()), f)
    }

    /// Create without taking the key mutex; caller must hold it
    pub(crate) fn create_unlocked(&self, key: &EntityKey, state: &T) -> Result<T> {
        let derived = state.derive_key()?;
        if &derived != key {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("create")
                .with_entity_type(T::ENTITY_TYPE)
                .with_key(key.as_str())
                .with_message(format!(
                    "state's {} '{}' does not match key",
                    T::KEY_FIELD,
                    derived
                )));
        }

        let value = serde_json::to_value(state)
            .map_err(|e| corrupt_record(T::ENTITY_TYPE, key.as_str(), e))?;

        if !self
            .backend
            .insert_entity(T::ENTITY_TYPE, key.as_str(), &value)?
        {
            return Err(StoreError::AlreadyExists {
                entity_type: T::ENTITY_TYPE.to_string(),
                key: key.to_string(),
            }
            .into());
        }

        tracing::debug!(entity_type = T::ENTITY_TYPE, entity_key = %key, "stored entity");
        Ok(state.clone())
    }

    fn patch_unlocked<P: Serialize + ?Sized>(&self, key: &EntityKey, partial: &P) -> Result<T> {
        let stored = self.load(key)?.ok_or_else(|| not_found::<T>(key))?;

        let partial = match serde_json::to_value(partial) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                return Err(invalid_patch::<T>(
                    key,
                    format!("patch must be an object, got {}", other),
                ))
            }
            Err(e) => return Err(invalid_patch::<T>(key, e.to_string())),
        };

        let merged =
            shallow_merge(stored, partial).map_err(|reason| invalid_patch::<T>(key, reason))?;

        let merged_key = key_policy::derive_key(&merged, T::KEY_FIELD)?;
        if &merged_key != key {
            return Err(invalid_patch::<T>(
                key,
                format!("patch may not change the key field '{}'", T::KEY_FIELD),
            ));
        }

        let entity: T = serde_json::from_value(merged.clone())
            .map_err(|e| invalid_patch::<T>(key, e.to_string()))?;

        if !self
            .backend
            .update_entity(T::ENTITY_TYPE, key.as_str(), &merged)?
        {
            return Err(not_found::<T>(key));
        }

        tracing::debug!(entity_type = T::ENTITY_TYPE, entity_key = %key, "patched entity");
        Ok(entity)
    }

    /// Delete without taking the key mutex; caller must hold it
    pub(crate) fn delete_unlocked(&self, key: &EntityKey) -> Result<()> {
        if !self.backend.delete_entity(T::ENTITY_TYPE, key.as_str())? {
            return Err(not_found::<T>(key));
        }
        tracing::debug!(entity_type = T::ENTITY_TYPE, entity_key = %key, "deleted entity");
        Ok(())
    }

    fn load(&self, key: &EntityKey) -> Result<Option<Value>> {
        self.backend.get_entity(T::ENTITY_TYPE, key.as_str())
    }
}

/// Overwrite the top-level fields of `stored` with those of `partial`
fn shallow_merge(stored: Value, partial: Map<String, Value>) -> std::result::Result<Value, String> {
    match stored {
        Value::Object(mut fields) => {
            fields.extend(partial);
            Ok(Value::Object(fields))
        }
        other => Err(format!("stored state is not an object: {}", other)),
    }
}

fn decode<T: Entity>(key: &EntityKey, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| corrupt_record(T::ENTITY_TYPE, key.as_str(), e))
}

fn not_found<T: Entity>(key: &EntityKey) -> ExError {
    StoreError::NotFound {
        entity_type: T::ENTITY_TYPE.to_string(),
        key: key.to_string(),
    }
    .into()
}

fn invalid_patch<T: Entity>(key: &EntityKey, reason: String) -> ExError {
    StoreError::InvalidPatch {
        entity_type: T::ENTITY_TYPE.to_string(),
        key: key.to_string(),
        reason,
    }
    .into()
}
