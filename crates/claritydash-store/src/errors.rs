//! Error handling for claritydash-store
//!
//! Wraps the claritydash-core ExError with store-specific helpers

use claritydash_core::errors::{ExError, ExErrorKind, StoreError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a storage failure for a named backend operation
pub fn storage_error(op: &str, err: impl std::fmt::Display) -> ExError {
    StoreError::Storage {
        op: op.to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Create an error for a lock poisoned by a panicking holder
pub fn lock_poisoned(lock: &str) -> ExError {
    StoreError::LockPoisoned {
        lock: lock.to_string(),
    }
    .into()
}

/// Create an error for a stored blob that failed to decode
pub fn corrupt_record(entity_type: &str, key: &str, err: impl std::fmt::Display) -> ExError {
    StoreError::CorruptRecord {
        entity_type: entity_type.to_string(),
        key: key.to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Create a config load error
pub fn config_error(reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("load_config")
        .with_message(reason.to_string())
}
