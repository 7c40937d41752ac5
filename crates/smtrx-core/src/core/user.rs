// crates/smtrx-core/src/core/user.rs
// ============================================================================
// Module: User Records
// Description: Internal principals mapped from external identities.
// Purpose: Define the user record and the inputs used to provision one.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`User`] is the tenant that owns API keys and optimization runs. Exactly
//! one user exists per [`ExternalId`]; users are never hard-deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExternalId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Subscription Tier
// ============================================================================

/// Subscription tier attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Default tier for newly provisioned users.
    #[default]
    Free,
    /// Paid individual tier.
    Pro,
    /// Contracted organisation tier.
    Enterprise,
}

impl SubscriptionTier {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
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

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown subscription tier: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Identity asserted by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider subject identifier.
    pub external_id: ExternalId,
    /// Primary email address.
    pub email: String,
    /// Display name, when the provider has one.
    pub name: Option<String>,
}

/// Internal user record.
///
/// # Invariants
/// - `external_id` is unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier.
    pub id: UserId,
    /// External identity provider subject.
    pub external_id: ExternalId,
    /// Email address captured at provisioning.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Subscription tier.
    pub tier: SubscriptionTier,
    /// Stored bytes attributed to the user.
    pub storage_used: i64,
    /// Access count within the current month window.
    pub access_count_month: i64,
    /// When `access_count_month` was last reset.
    pub access_reset_at: Timestamp,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl User {
    /// Builds a freshly provisioned user with default tier and zeroed counters.
    #[must_use]
    pub fn provision(identity: ExternalIdentity, now: Timestamp) -> Self {
        Self {
            id: UserId::generate(),
            external_id: identity.external_id,
            email: identity.email,
            name: identity.name,
            tier: SubscriptionTier::default(),
            storage_used: 0,
            access_count_month: 0,
            access_reset_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
