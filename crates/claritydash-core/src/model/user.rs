//! User account entity
//!
//! One record per account, keyed by email. The `id` field mirrors the email
//! so records exported elsewhere keep a stable identifier.

use claritydash_core_types::Sensitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::Entity;

/// SHA-256 hex of "123", shared by the baseline accounts
pub const SEED_PASSWORD_HASH: &str =
    "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

/// Billing plan of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!(
                "unknown subscription tier '{}' (expected free, pro or premium)",
                other
            )),
        }
    }
}

/// Stored account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: Sensitive<String>,
    pub subscription_tier: SubscriptionTier,
}

impl User {
    /// New free-tier account; `id` is set to the email
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let email = email.into();
        Self {
            id: email.clone(),
            name: name.into(),
            email,
            password_hash: Sensitive::new(password_hash.into()),
            subscription_tier: SubscriptionTier::Free,
        }
    }

    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.subscription_tier = tier;
        self
    }

    /// The account without its credential digest
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            subscription_tier: self.subscription_tier,
        }
    }
}

impl Entity for User {
    const ENTITY_TYPE: &'static str = "user";
    const INDEX_NAME: &'static str = "users";
    const KEY_FIELD: &'static str = "email";

    fn seed_data() -> Vec<Self> {
        seed_users()
    }
}

/// Account view safe to hand back to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subscription_tier: SubscriptionTier,
}

/// Partial update of a user; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<SubscriptionTier>,
}

impl UserPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn tier(tier: SubscriptionTier) -> Self {
        Self {
            subscription_tier: Some(tier),
            ..Self::default()
        }
    }
}

/// Baseline accounts inserted on first use
pub fn seed_users() -> Vec<User> {
    vec![
        User::new("Alice", "user1@example.com", SEED_PASSWORD_HASH).with_tier(SubscriptionTier::Pro),
        User::new("Bob", "user2@example.com", SEED_PASSWORD_HASH),
    ]
}
