//! Sharded per-key lock registry
//!
//! Every key maps to its own mutex, so work on one key is serialized while
//! work on different keys never shares a lock. The registry map itself is
//! locked only long enough to find or create a key's mutex.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::errors::{lock_poisoned, Result};

const INITIAL_PRUNE_AT: usize = 64;

struct Slots<K> {
    by_key: HashMap<K, Weak<Mutex<()>>>,
    prune_at: usize,
}

/// Registry of per-key mutexes
///
/// Mutexes are held weakly and dropped once no caller uses them; dead
/// entries are swept whenever the map doubles past its last live size.
pub struct KeyLocks<K> {
    name: &'static str,
    slots: Mutex<Slots<K>>,
}

impl<K: Hash + Eq + Clone> KeyLocks<K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(Slots {
                by_key: HashMap::new(),
                prune_at: INITIAL_PRUNE_AT,
            }),
        }
    }

    /// Run `f` while holding the mutex for `key`
    ///
    /// The guarded data is `()`, so a mutex poisoned by a panicking holder is
    /// recovered rather than reported: the state it orders lives in the
    /// backend, which every call re-reads.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let handle = self.handle(key)?;
        let _guard: MutexGuard<'_, ()> = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn handle(&self, key: &K) -> Result<Arc<Mutex<()>>> {
        let mut slots = self.slots.lock().map_err(|_| lock_poisoned(self.name))?;

        if let Some(live) = slots.by_key.get(key).and_then(Weak::upgrade) {
            return Ok(live);
        }

        let handle = Arc::new(Mutex::new(()));
        slots.by_key.insert(key.clone(), Arc::downgrade(&handle));

        if slots.by_key.len() >= slots.prune_at {
            slots.by_key.retain(|_, slot| slot.strong_count() > 0);
            slots.prune_at = (slots.by_key.len() * 2).max(INITIAL_PRUNE_AT);
            tracing::debug!(
                registry = self.name,
                live = slots.by_key.len(),
                "pruned idle key locks"
            );
        }

        Ok(handle)
    }

    /// Number of registry entries (live or not yet swept)
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.by_key.len()).unwrap_or(0)
    }
}
