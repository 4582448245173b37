//! ClarityDash Store - indexed entity persistence
//!
//! Provides:
//! - Per-key entity records with shallow-merge patches (`EntityStore`)
//! - An insertion-ordered enumeration index per entity type (`EntityIndex`)
//! - The combined facade request handlers call (`IndexedStore`)
//! - Once-per-type baseline seeding and store/index reconciliation
//! - In-memory and SQLite backends, the latter with embedded migrations

pub mod backend;
pub mod config;
pub mod db;
pub mod entity_store;
pub mod errors;
pub mod index;
pub mod indexed;
pub mod locks;
pub mod migrations;
pub mod reconcile;
pub mod seed;
pub mod storage;

// Re-export key types
pub use backend::{Backend, IndexRecord, MemoryBackend, SqliteBackend};
pub use config::StoreConfig;
pub use entity_store::EntityStore;
pub use errors::Result;
pub use index::EntityIndex;
pub use indexed::IndexedStore;
pub use reconcile::ReconcileReport;
pub use seed::SeedReport;
pub use storage::Storage;
