// crates/smtrx-core/tests/provisioning.rs
// ============================================================================
// Module: User Provisioning Tests
// Description: External identity resolution and first-login creation.
// Purpose: Ensure exactly one user exists per external identity.
// Dependencies: smtrx-core
// ============================================================================
//! ## Overview
//! Covers creation defaults, idempotent resolution, concurrent first logins,
//! input bounds, and behaviour without a datastore.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::thread;

use smtrx_core::ExternalId;
use smtrx_core::LedgerError;
use smtrx_core::SubscriptionTier;

use crate::common::Harness;
use crate::common::START_MILLIS;
use crate::common::identity;

/// Verifies a first login creates a free-tier user with zeroed counters.
#[test]
fn first_login_creates_user_with_defaults() {
    let harness = Harness::new();
    let user = harness.services.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    assert_eq!(user.external_id, ExternalId::new("ext-1"));
    assert_eq!(user.email, "ext-1@example.com");
    assert_eq!(user.tier, SubscriptionTier::Free);
    assert_eq!(user.storage_used, 0);
    assert_eq!(user.access_count_month, 0);
    assert_eq!(user.created_at.as_unix_millis(), START_MILLIS);
    assert_eq!(user.access_reset_at, user.created_at);
    assert_eq!(harness.audit.names(), vec!["user_provisioned"]);
}

/// Verifies repeat logins return the same user and ignore profile changes.
#[test]
fn repeat_login_returns_existing_user() {
    let harness = Harness::new();
    let first = harness.services.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    let mut changed = identity("ext-1");
    changed.email = "renamed@example.com".to_string();
    let second = harness.services.provisioner.resolve_or_create(changed).unwrap();
    assert_eq!(first, second);
    assert_eq!(harness.audit.count("user_provisioned"), 1);
}

/// Verifies concurrent first logins converge on one user.
#[test]
fn concurrent_first_logins_converge() {
    let harness = Arc::new(Harness::new());
    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let harness = Arc::clone(&harness);
            thread::spawn(move || {
                harness.services.provisioner.resolve_or_create(identity("ext-race")).unwrap()
            })
        })
        .collect();
    let users: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert!(users.iter().all(|user| user.id == users[0].id));
    assert_eq!(harness.audit.count("user_provisioned"), 1);
}

/// Verifies `find` never creates users.
#[test]
fn find_does_not_create() {
    let harness = Harness::new();
    let external = ExternalId::new("ext-1");
    assert!(harness.services.provisioner.find(&external).unwrap().is_none());
    let user = harness.user("ext-1");
    assert_eq!(harness.services.provisioner.find(&external).unwrap(), Some(user));
}

/// Verifies malformed identities are rejected before storage.
#[test]
fn malformed_identities_are_rejected() {
    let harness = Harness::new();
    let long_external = "e".repeat(257);
    for external in ["", "   ", long_external.as_str()] {
        let result = harness.services.provisioner.resolve_or_create(identity(external));
        assert!(matches!(result, Err(LedgerError::Invalid(_))));
    }
    let mut long_email = identity("ext-1");
    long_email.email = format!("{}@example.com", "m".repeat(320));
    let result = harness.services.provisioner.resolve_or_create(long_email);
    assert!(matches!(result, Err(LedgerError::Invalid(_))));
}

/// Verifies provisioning needs a datastore while lookups degrade to empty.
#[test]
fn unconfigured_provisioning_fails() {
    let harness = Harness::unconfigured();
    let result = harness.services.provisioner.resolve_or_create(identity("ext-1"));
    assert_eq!(result.unwrap_err(), LedgerError::Configuration);
    assert!(harness.services.provisioner.find(&ExternalId::new("ext-1")).unwrap().is_none());
    assert!(!harness.services.is_configured());
}
