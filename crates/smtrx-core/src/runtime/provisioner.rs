// crates/smtrx-core/src/runtime/provisioner.rs
// ============================================================================
// Module: User Provisioner
// Description: Maps external identities onto internal users.
// Purpose: Guarantee exactly one user per external identity.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`UserProvisioner::resolve_or_create`] looks the identity up and inserts a
//! user only when none exists. Two concurrent first logins can both miss the
//! lookup; the datastore's unique index on `external_id` makes one insert
//! fail with a conflict, and the loser re-reads and returns the winner's row.
//! Profile changes at the identity provider are not propagated to existing
//! users.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ExternalId;
use crate::core::ExternalIdentity;
use crate::core::User;
use crate::interfaces::StoreError;
use crate::runtime::audit::AuditOutcome;
use crate::runtime::audit::LedgerAuditEvent;
use crate::runtime::error::LedgerError;
use crate::runtime::services::LedgerContext;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum external identifier length in bytes.
pub const MAX_EXTERNAL_ID_LENGTH: usize = 256;
/// Maximum email length in bytes.
pub const MAX_EMAIL_LENGTH: usize = 320;

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Resolves external identities to users, creating them on first sight.
#[derive(Debug, Clone)]
pub struct UserProvisioner {
    /// Shared service dependencies.
    ctx: LedgerContext,
}

impl UserProvisioner {
    /// Builds a provisioner over `ctx`.
    #[must_use]
    pub const fn new(ctx: LedgerContext) -> Self {
        Self {
            ctx,
        }
    }

    /// Returns true when backed by a datastore.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.ctx.gateway.is_configured()
    }

    /// Returns the user for `identity`, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Configuration`] without a datastore,
    /// [`LedgerError::Invalid`] for malformed identities, and datastore
    /// failures otherwise.
    pub fn resolve_or_create(&self, identity: ExternalIdentity) -> Result<User, LedgerError> {
        let store = self.ctx.gateway.writable()?;
        validate_identity(&identity)?;
        if let Some(user) = store.find_user_by_external_id(&identity.external_id)? {
            return Ok(user);
        }
        let user = User::provision(identity, self.ctx.clock.now());
        match store.insert_user(&user) {
            Ok(()) => {
                self.ctx.audit.record(
                    &LedgerAuditEvent::new("user_provisioned", user.created_at, AuditOutcome::Ok)
                        .user(&user.id),
                );
                Ok(user)
            }
            Err(StoreError::Conflict(message)) => store
                .find_user_by_external_id(&user.external_id)?
                .ok_or(LedgerError::ConstraintViolation(message)),
            Err(err) => Err(err.into()),
        }
    }

    /// Looks a user up without creating one.
    ///
    /// # Errors
    ///
    /// Returns datastore failures. An unconfigured ledger yields `Ok(None)`.
    pub fn find(&self, external_id: &ExternalId) -> Result<Option<User>, LedgerError> {
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(None);
        };
        Ok(store.find_user_by_external_id(external_id)?)
    }
}

/// Rejects identities the datastore should never see.
fn validate_identity(identity: &ExternalIdentity) -> Result<(), LedgerError> {
    let external_id = identity.external_id.as_str();
    if external_id.trim().is_empty() {
        return Err(LedgerError::Invalid("external_id must be non-empty".to_string()));
    }
    if external_id.len() > MAX_EXTERNAL_ID_LENGTH {
        return Err(LedgerError::Invalid(format!(
            "external_id exceeds {MAX_EXTERNAL_ID_LENGTH} bytes"
        )));
    }
    if identity.email.len() > MAX_EMAIL_LENGTH {
        return Err(LedgerError::Invalid(format!("email exceeds {MAX_EMAIL_LENGTH} bytes")));
    }
    Ok(())
}
