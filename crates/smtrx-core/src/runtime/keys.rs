// crates/smtrx-core/src/runtime/keys.rs
// ============================================================================
// Module: API Key Service
// Description: Issue, validate, revoke, and list API keys.
// Purpose: Own the credential lifecycle on top of the datastore.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! The plaintext secret exists only inside [`IssuedApiKey`] at issue time.
//! Validation hashes the presented secret and looks the digest up; any
//! unknown, revoked, or malformed secret is simply "not authenticated" and
//! never an error. Recording `last_used_at` is best effort: a failed touch is
//! audited and does not change the validation result.
//!
//! Security posture: presented secrets are untrusted input. Oversized or
//! mis-prefixed values are rejected before any datastore call, and audit
//! events carry display prefixes at most.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ApiKey;
use crate::core::ApiKeyId;
use crate::core::ApiKeySecret;
use crate::core::NewApiKey;
use crate::core::UserId;
use crate::core::ValidatedKey;
use crate::core::api_key::MAX_KEY_NAME_LENGTH;
use crate::core::api_key::is_well_formed_secret;
use crate::core::hash_api_key;
use crate::interfaces::StoreError;
use crate::runtime::audit::AuditOutcome;
use crate::runtime::audit::LedgerAuditEvent;
use crate::runtime::error::LedgerError;
use crate::runtime::services::LedgerContext;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Newly issued key: the stored record plus the one-time plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedApiKey {
    /// Stored record.
    pub record: ApiKey,
    /// Plaintext secret; not recoverable after this value is dropped.
    pub secret: ApiKeySecret,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// API key lifecycle service.
#[derive(Debug, Clone)]
pub struct ApiKeyService {
    /// Shared service dependencies.
    ctx: LedgerContext,
}

impl ApiKeyService {
    /// Builds the service over `ctx`.
    #[must_use]
    pub const fn new(ctx: LedgerContext) -> Self {
        Self {
            ctx,
        }
    }

    /// Issues a new key named `name` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Configuration`] without a datastore,
    /// [`LedgerError::Invalid`] for a bad name, [`LedgerError::NotFound`] when
    /// the user does not exist, and [`LedgerError::ConstraintViolation`] on a
    /// digest collision.
    pub fn issue(&self, user_id: &UserId, name: &str) -> Result<IssuedApiKey, LedgerError> {
        let store = self.ctx.gateway.writable()?;
        let name = normalize_key_name(name)?;
        let secret = ApiKeySecret::generate();
        let row = NewApiKey {
            id: ApiKeyId::generate(),
            user_id: user_id.clone(),
            name,
            key_prefix: secret.display_prefix().to_string(),
            key_hash: secret.digest(),
            created_at: self.ctx.clock.now(),
        };
        let record = store.insert_api_key(&row)?;
        self.ctx.audit.record(
            &LedgerAuditEvent::new("api_key_issued", record.created_at, AuditOutcome::Ok)
                .user(&record.user_id)
                .key(&record.id, &record.key_prefix),
        );
        Ok(IssuedApiKey {
            record,
            secret,
        })
    }

    /// Authenticates a presented secret.
    ///
    /// Returns `Ok(None)` for unknown, revoked, or malformed secrets and when
    /// no datastore is configured.
    ///
    /// # Errors
    ///
    /// Returns datastore failures from the lookup itself.
    pub fn validate(&self, presented: &str) -> Result<Option<ValidatedKey>, LedgerError> {
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(None);
        };
        let now = self.ctx.clock.now();
        if !is_well_formed_secret(presented) {
            self.ctx.audit.record(
                &LedgerAuditEvent::new("api_key_rejected", now, AuditOutcome::Denied)
                    .detail("malformed"),
            );
            return Ok(None);
        }
        let Some(mut found) = store.find_active_api_key(&hash_api_key(presented))? else {
            self.ctx.audit.record(
                &LedgerAuditEvent::new("api_key_rejected", now, AuditOutcome::Denied)
                    .detail("unknown_or_revoked"),
            );
            return Ok(None);
        };
        match store.touch_api_key(&found.key.id, now) {
            Ok(()) => found.key.last_used_at = Some(now),
            Err(err) => self.ctx.audit.record(
                &LedgerAuditEvent::new("api_key_touch_failed", now, AuditOutcome::Error)
                    .user(&found.user.id)
                    .key(&found.key.id, &found.key.key_prefix)
                    .detail(err.to_string()),
            ),
        }
        self.ctx.audit.record(
            &LedgerAuditEvent::new("api_key_validated", now, AuditOutcome::Ok)
                .user(&found.user.id)
                .key(&found.key.id, &found.key.key_prefix),
        );
        Ok(Some(found))
    }

    /// Revokes `key_id` on behalf of `user_id`.
    ///
    /// Revoking an already revoked key succeeds and keeps the first
    /// revocation time; the repeat is audited with detail `already_revoked`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the key does not exist or is
    /// owned by someone else, and [`LedgerError::Configuration`] without a
    /// datastore.
    pub fn revoke(&self, user_id: &UserId, key_id: &ApiKeyId) -> Result<ApiKey, LedgerError> {
        let store = self.ctx.gateway.writable()?;
        let now = self.ctx.clock.now();
        if let Some(record) = store.revoke_api_key(user_id, key_id, now)? {
            let mut event = LedgerAuditEvent::new("api_key_revoked", now, AuditOutcome::Ok)
                .user(user_id)
                .key(&record.id, &record.key_prefix);
            if record.revoked_at.is_some_and(|revoked_at| revoked_at < now) {
                event = event.detail("already_revoked");
            }
            self.ctx.audit.record(&event);
            return Ok(record);
        }
        self.ctx.audit.record(
            &LedgerAuditEvent::new("api_key_revoke_denied", now, AuditOutcome::Denied)
                .user(user_id)
                .key_id(key_id),
        );
        Err(StoreError::NotFound(format!("api key {key_id}")).into())
    }

    /// Lists every key owned by `user_id`, newest first, revoked included.
    ///
    /// # Errors
    ///
    /// Returns datastore failures. An unconfigured ledger yields no keys.
    pub fn list(&self, user_id: &UserId) -> Result<Vec<ApiKey>, LedgerError> {
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(Vec::new());
        };
        Ok(store.list_api_keys(user_id)?)
    }
}

/// Trims a key name and enforces its length bounds.
fn normalize_key_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Invalid("api key name must be non-empty".to_string()));
    }
    if trimmed.chars().count() > MAX_KEY_NAME_LENGTH {
        return Err(LedgerError::Invalid(format!(
            "api key name exceeds {MAX_KEY_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
