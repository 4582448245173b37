//! Domain model for the entity store
//!
//! - [`Entity`]: compile-time description of a stored entity type
//! - [`EntityKey`] and the key policy: key derivation and validation
//! - [`User`]: the account entity persisted by ClarityDash

pub mod entity;
pub mod key_policy;
pub mod user;

pub use entity::Entity;
pub use key_policy::EntityKey;
pub use user::{SubscriptionTier, User, UserPatch, UserProfile};
