//! Store/index consistency
//!
//! Drift between stored records and index membership can only come from a
//! combined create or delete whose undo step also failed. `reconcile`
//! repairs it; `check_consistency` only reports it.
//!
//! Both compare a snapshot of stored keys with a snapshot of indexed keys,
//! then re-check each differing key under its own mutex before acting, so a
//! create or delete in flight during the scan is never mistaken for drift.

use claritydash_core::errors::StoreError;
use claritydash_core::model::{Entity, EntityKey};
use std::collections::HashSet;

use crate::errors::Result;
use crate::indexed::IndexedStore;

/// What a reconciliation pass repaired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stored keys that were missing from the index and have been added
    pub indexed: Vec<EntityKey>,
    /// Index entries without stored state that have been removed
    pub dropped: Vec<EntityKey>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.indexed.is_empty() && self.dropped.is_empty()
    }

    pub fn repaired(&self) -> usize {
        self.indexed.len() + self.dropped.len()
    }
}

/// Membership of one key on each side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    StoredOnly,
    IndexedOnly,
    Consistent,
}

impl<T: Entity> IndexedStore<T> {
    /// Make index membership match the stored records
    ///
    /// Stored keys missing from the index are added (at the end of the
    /// order); index entries with no stored record are removed.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        self.observe_type("entity_reconcile", || self.reconcile_unobserved())
    }

    /// Verify that index membership matches the stored records
    ///
    /// # Errors
    ///
    /// `StorageFailure` describing the drift if any key is present on only
    /// one side.
    pub fn check_consistency(&self) -> Result<()> {
        self.observe_type("entity_check_consistency", || {
            let mut unindexed = Vec::new();
            let mut dangling = Vec::new();

            for key in self.drift_candidates()? {
                match self.locked_membership(&key)? {
                    Membership::StoredOnly => unindexed.push(key),
                    Membership::IndexedOnly => dangling.push(key),
                    Membership::Consistent => {}
                }
            }

            if unindexed.is_empty() && dangling.is_empty() {
                return Ok(());
            }

            Err(StoreError::IndexDrift {
                entity_type: T::ENTITY_TYPE.to_string(),
                message: format!(
                    "stored but unindexed: [{}]; indexed but not stored: [{}]",
                    join_keys(&unindexed),
                    join_keys(&dangling)
                ),
            }
            .into())
        })
    }

    pub(crate) fn reconcile_unobserved(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for key in self.drift_candidates()? {
            self.entities.locked(&key, || {
                let stored = self.entities.exists(&key)?;
                let changed = if stored {
                    self.index.add(&key)?
                } else {
                    self.index.remove(&key)?
                };

                if changed && stored {
                    tracing::warn!(
                        entity_type = T::ENTITY_TYPE,
                        entity_key = %key,
                        "indexed stored entity missing from index"
                    );
                    report.indexed.push(key.clone());
                } else if changed {
                    tracing::warn!(
                        entity_type = T::ENTITY_TYPE,
                        entity_key = %key,
                        "dropped index entry with no stored entity"
                    );
                    report.dropped.push(key.clone());
                }
                Ok(())
            })?;
        }

        if !report.is_clean() {
            tracing::info!(
                entity_type = T::ENTITY_TYPE,
                indexed = report.indexed.len(),
                dropped = report.dropped.len(),
                "reconciled index"
            );
        }
        Ok(report)
    }

    /// Keys present on exactly one side, by unlocked snapshot
    ///
    /// Stored-only keys come first in creation order, then indexed-only keys
    /// in index order.
    fn drift_candidates(&self) -> Result<Vec<EntityKey>> {
        let stored = self.entities.keys()?;
        let indexed = self.index.list()?;

        let stored_set: HashSet<&EntityKey> = stored.iter().collect();
        let indexed_set: HashSet<&EntityKey> = indexed.iter().collect();

        let mut candidates: Vec<EntityKey> = stored
            .iter()
            .filter(|key| !indexed_set.contains(key))
            .cloned()
            .collect();
        candidates.extend(
            indexed
                .iter()
                .filter(|key| !stored_set.contains(key))
                .cloned(),
        );
        Ok(candidates)
    }

    fn locked_membership(&self, key: &EntityKey) -> Result<Membership> {
        self.entities.locked(key, || {
            let stored = self.entities.exists(key)?;
            let indexed = self.index.contains(key)?;
            Ok(match (stored, indexed) {
                (true, false) => Membership::StoredOnly,
                (false, true) => Membership::IndexedOnly,
                _ => Membership::Consistent,
            })
        })
    }
}

fn join_keys(keys: &[EntityKey]) -> String {
    keys.iter()
        .map(EntityKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
