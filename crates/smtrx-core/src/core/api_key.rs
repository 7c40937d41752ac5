// crates/smtrx-core/src/core/api_key.rs
// ============================================================================
// Module: API Key Credentials
// Description: API key records, secret generation, and digest helpers.
// Purpose: Define the credential format and the only place secrets are minted.
// Dependencies: base64, rand, serde, sha2
// ============================================================================

//! ## Overview
//! An API key secret is `smtrx_` followed by 24 bytes of OS randomness encoded
//! as unpadded base64url (38 characters in total). Only the SHA-256 digest and
//! a 12 character display prefix are ever persisted; [`ApiKeySecret`] is the
//! sole holder of the plaintext and it redacts itself from debug output.
//!
//! The display prefix is the literal `smtrx_` plus the first six encoded
//! characters (36 bits), leaving 156 bits of the secret undisclosed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::sha256_hex;
use crate::core::identifiers::ApiKeyId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;
use crate::core::user::User;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed, non-secret prefix carried by every API key.
pub const API_KEY_PREFIX: &str = "smtrx_";
/// Number of random bytes encoded into each secret.
pub const API_KEY_RANDOM_BYTES: usize = 24;
/// Total length of a well-formed API key secret.
pub const API_KEY_LEN: usize = 38;
/// Number of leading secret characters safe to display.
pub const DISPLAY_PREFIX_LEN: usize = 12;
/// Maximum length of a human-assigned key name.
pub const MAX_KEY_NAME_LENGTH: usize = 100;

// ============================================================================
// SECTION: Secrets
// ============================================================================

/// Plaintext API key secret.
///
/// # Invariants
/// - Never persisted and never written to debug or audit output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeySecret(String);

impl ApiKeySecret {
    /// Mints a new secret from OS randomness.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; API_KEY_RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Returns the plaintext secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the storage digest of the secret.
    #[must_use]
    pub fn digest(&self) -> String {
        hash_api_key(&self.0)
    }

    /// Returns the display prefix of the secret.
    #[must_use]
    pub fn display_prefix(&self) -> &str {
        display_prefix(&self.0)
    }
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKeySecret(<redacted>)")
    }
}

/// Returns the lowercase hex SHA-256 digest of a presented secret.
#[must_use]
pub fn hash_api_key(secret: &str) -> String {
    sha256_hex(secret.as_bytes())
}

/// Returns at most the first [`DISPLAY_PREFIX_LEN`] characters of `secret`.
#[must_use]
pub fn display_prefix(secret: &str) -> &str {
    match secret.char_indices().nth(DISPLAY_PREFIX_LEN) {
        Some((end, _)) => &secret[.. end],
        None => secret,
    }
}

/// Returns true when `secret` has the shape of an issued key.
#[must_use]
pub fn is_well_formed_secret(secret: &str) -> bool {
    secret.len() == API_KEY_LEN
        && secret.starts_with(API_KEY_PREFIX)
        && secret[API_KEY_PREFIX.len() ..]
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Row inserted when a key is issued.
///
/// # Invariants
/// - `key_hash` is the digest of the full secret and unique across keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApiKey {
    /// Record identifier.
    pub id: ApiKeyId,
    /// Owning user.
    pub user_id: UserId,
    /// Human-assigned name.
    pub name: String,
    /// Display prefix.
    pub key_prefix: String,
    /// Digest of the full secret.
    pub key_hash: String,
    /// Issue time.
    pub created_at: Timestamp,
}

/// Stored API key as returned to callers.
///
/// # Invariants
/// - Carries neither the plaintext secret nor its digest.
/// - Once `is_active` is false it never becomes true again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Record identifier.
    pub id: ApiKeyId,
    /// Owning user.
    pub user_id: UserId,
    /// Human-assigned name.
    pub name: String,
    /// Display prefix.
    pub key_prefix: String,
    /// Last successful validation, if any.
    pub last_used_at: Option<Timestamp>,
    /// Issue time.
    pub created_at: Timestamp,
    /// Revocation time, if revoked.
    pub revoked_at: Option<Timestamp>,
    /// Whether the key authenticates.
    pub is_active: bool,
}

impl From<NewApiKey> for ApiKey {
    fn from(row: NewApiKey) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            key_prefix: row.key_prefix,
            last_used_at: None,
            created_at: row.created_at,
            revoked_at: None,
            is_active: true,
        }
    }
}

/// Active key together with the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedKey {
    /// The matched key.
    pub key: ApiKey,
    /// The owning user.
    pub user: User,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
