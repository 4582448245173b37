//! Baseline seeding
//!
//! Seeding inserts a fixed baseline set once per entity type. Completion is
//! recorded as a marker in the type's index record, so a store whose seed
//! users were later deleted is not re-seeded on the next start.
//!
//! `ensure_seed` runs under a per-type seed mutex, which ranks above the key
//! and index mutexes: concurrent callers in one process see exactly one of
//! them do the inserts. Every call first reconciles the index.

use claritydash_core::errors::ExErrorKind;
use claritydash_core::model::{Entity, EntityKey};

use crate::errors::Result;
use crate::indexed::IndexedStore;
use crate::reconcile::ReconcileReport;

/// Outcome of one `ensure_seed` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Whether this call ran the seed (false if the marker was already set)
    pub seeded: bool,
    /// Seed keys inserted by this call
    pub created: Vec<EntityKey>,
    /// Seed keys skipped because an entity already existed under them
    pub skipped: Vec<EntityKey>,
    /// Repairs made by the reconciliation pass that precedes seeding
    pub reconciled: ReconcileReport,
}

impl<T: Entity> IndexedStore<T> {
    /// Insert `seed` unless this entity type has been seeded before
    ///
    /// Existing entities are never overwritten; a seed entry whose key is
    /// already taken is skipped.
    ///
    /// # Errors
    ///
    /// `InvalidKey` if a seed entry has no valid key; storage errors as for
    /// [`IndexedStore::create`]. The marker is only set once every entry has
    /// been inserted or skipped, so a failed seed is retried on the next call.
    pub fn ensure_seed(&self, seed: &[T]) -> Result<SeedReport> {
        self.observe_type("entity_ensure_seed", || {
            self.seed_locks
                .with_lock(&T::INDEX_NAME, || self.seed_locked(seed))
        })
    }

    /// [`IndexedStore::ensure_seed`] with the type's own baseline set
    pub fn ensure_default_seed(&self) -> Result<SeedReport> {
        self.ensure_seed(&T::seed_data())
    }

    fn seed_locked(&self, seed: &[T]) -> Result<SeedReport> {
        let mut report = SeedReport {
            reconciled: self.reconcile_unobserved()?,
            ..SeedReport::default()
        };

        if self.index.is_seeded()? {
            tracing::debug!(entity_type = T::ENTITY_TYPE, "already seeded");
            return Ok(report);
        }

        for state in seed {
            let key = state.derive_key()?;
            match self.create_indexed(&key, state) {
                Ok(_) => report.created.push(key),
                Err(e) if e.kind() == ExErrorKind::AlreadyExists => {
                    tracing::debug!(
                        entity_type = T::ENTITY_TYPE,
                        entity_key = %key,
                        "seed entity already present"
                    );
                    report.skipped.push(key);
                }
                Err(e) => return Err(e),
            }
        }

        self.index.mark_seeded()?;
        report.seeded = true;

        tracing::info!(
            entity_type = T::ENTITY_TYPE,
            created = report.created.len(),
            skipped = report.skipped.len(),
            "seeded baseline entities"
        );
        Ok(report)
    }
}
