// crates/smtrx-core/tests/key_issuance.rs
// ============================================================================
// Module: API Key Issuance Tests
// Description: Secret format, uniqueness, and digest properties.
// Purpose: Ensure minted secrets are well formed and never collide.
// Dependencies: smtrx-core, proptest
// ============================================================================

//! ## Overview
//! Checks secret generation at volume and the digest/prefix helpers under
//! arbitrary input.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use smtrx_core::API_KEY_LEN;
use smtrx_core::API_KEY_PREFIX;
use smtrx_core::ApiKeySecret;
use smtrx_core::DISPLAY_PREFIX_LEN;
use smtrx_core::display_prefix;
use smtrx_core::hash_api_key;
use smtrx_core::is_well_formed_secret;

/// Verifies ten thousand secrets and their digests are pairwise distinct.
#[test]
fn ten_thousand_secrets_are_distinct() {
    let mut secrets = BTreeSet::new();
    let mut digests = BTreeSet::new();
    for _ in 0 .. 10_000 {
        let secret = ApiKeySecret::generate();
        assert!(is_well_formed_secret(secret.expose()));
        digests.insert(secret.digest());
        secrets.insert(secret.expose().to_string());
    }
    assert_eq!(secrets.len(), 10_000);
    assert_eq!(digests.len(), 10_000);
}

/// Verifies the digest is lowercase hex SHA-256 of the full secret.
#[test]
fn digest_matches_known_vector() {
    assert_eq!(
        hash_api_key("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

/// Verifies the stored prefix never reveals more than the display length.
#[test]
fn display_prefix_discloses_six_random_characters() {
    let secret = ApiKeySecret::generate();
    let prefix = secret.display_prefix();
    assert_eq!(prefix.len(), DISPLAY_PREFIX_LEN);
    assert!(prefix.starts_with(API_KEY_PREFIX));
    assert_eq!(API_KEY_LEN - prefix.len(), 26);
}

proptest! {
    #[test]
    fn digest_is_deterministic_hex(secret in ".{0,128}") {
        let first = hash_api_key(&secret);
        prop_assert_eq!(&first, &hash_api_key(&secret));
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.bytes().all(|byte| byte.is_ascii_digit() || (b'a' ..= b'f').contains(&byte)));
    }

    #[test]
    fn display_prefix_is_a_prefix(secret in ".{0,64}") {
        let prefix = display_prefix(&secret);
        prop_assert!(secret.starts_with(prefix));
        prop_assert!(prefix.chars().count() <= DISPLAY_PREFIX_LEN);
    }

    #[test]
    fn malformed_secrets_are_never_well_formed(tail in "[A-Za-z0-9_-]{0,31}|[A-Za-z0-9_-]{33,48}") {
        let candidate = format!("{API_KEY_PREFIX}{tail}");
        prop_assert!(!is_well_formed_secret(&candidate));
    }
}
