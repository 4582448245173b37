//! ClarityDash Core - entity model, error and logging facilities
//!
//! This crate provides the pieces shared by the entity store and its callers:
//! - The `Entity` trait and key policy (`EntityKey`, key derivation/validation)
//! - The `User` account entity and its baseline seed set
//! - The canonical error facility (`ExError`, `ExErrorKind`, `StoreError`)
//! - The structured logging facility and boundary logging macros

pub mod errors;
pub mod logging_facility;
pub mod model;

// Re-export commonly used types
pub use claritydash_core_types::schema;
pub use errors::{ExError, ExErrorKind, Result, StoreError};
pub use model::{Entity, EntityKey, SubscriptionTier, User, UserPatch, UserProfile};
