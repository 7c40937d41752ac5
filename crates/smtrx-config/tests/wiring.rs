// crates/smtrx-config/tests/wiring.rs
// =============================================================================
// Module: Service Wiring Tests
// Description: Builds services from config and exercises them end to end.
// Purpose: Ensure each store and audit selection produces working services.
// =============================================================================

//! Service wiring tests for smtrx-config.

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

mod common;

use std::fs;

use smtrx_config::AuditSinkType;
use smtrx_config::StoreType;
use smtrx_config::WiringError;
use smtrx_config::build_services;
use smtrx_core::ExternalId;
use smtrx_core::ExternalIdentity;
use smtrx_core::LedgerError;
use smtrx_core::RunQuery;
use smtrx_core::UserId;
use tempfile::TempDir;

fn identity(external_id: &str) -> ExternalIdentity {
    ExternalIdentity {
        external_id: ExternalId::new(external_id),
        email: format!("{external_id}@example.com"),
        name: None,
    }
}

#[test]
fn disabled_store_builds_unconfigured_services() {
    let config = common::minimal_config().unwrap();
    let services = build_services(&config).unwrap();
    assert!(!services.is_configured());

    let result = services.provisioner.resolve_or_create(identity("ext-1"));
    assert!(matches!(result, Err(LedgerError::Configuration)));
    let listing = services.queries.list(&UserId::new("u-1"), RunQuery::default()).unwrap();
    assert!(listing.runs.is_empty());
    assert_eq!(listing.pagination.total, 0);
}

#[test]
fn memory_store_builds_working_services() {
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Memory;
    let services = build_services(&config).unwrap();
    assert!(services.is_configured());

    let user = services.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    let issued = services.api_keys.issue(&user.id, "ci").unwrap();
    let validated = services.api_keys.validate(issued.secret.expose()).unwrap().unwrap();
    assert_eq!(validated.user.id, user.id);
}

#[test]
fn sqlite_store_persists_across_builds() {
    let temp = TempDir::new().unwrap();
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Sqlite;
    config.store.path = Some(temp.path().join("nested").join("ledger.sqlite"));

    let first = build_services(&config).unwrap();
    let user = first.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    drop(first);

    let second = build_services(&config).unwrap();
    let again = second.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    assert_eq!(again.id, user.id);
}

#[test]
fn sqlite_directory_path_fails_init() {
    let temp = TempDir::new().unwrap();
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Sqlite;
    config.store.path = Some(temp.path().to_path_buf());
    assert!(matches!(build_services(&config), Err(WiringError::Init(_))));
}

#[test]
fn invalid_config_is_rejected_before_wiring() {
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Sqlite;
    assert!(matches!(build_services(&config), Err(WiringError::Config(_))));
}

#[test]
fn query_limits_flow_into_the_engine() {
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Memory;
    config.query.default_limit = 7;
    config.query.max_limit = 9;
    let services = build_services(&config).unwrap();
    assert_eq!(services.queries.limits().default_limit, 7);
    let user = services.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    let over = RunQuery {
        limit: Some(10),
        ..RunQuery::default()
    };
    assert!(matches!(services.queries.list(&user.id, over), Err(LedgerError::Invalid(_))));
}

#[test]
fn file_audit_sink_records_json_lines() {
    let temp = TempDir::new().unwrap();
    let audit_path = temp.path().join("audit.jsonl");
    let mut config = common::minimal_config().unwrap();
    config.store.store_type = StoreType::Memory;
    config.audit.sink = AuditSinkType::File;
    config.audit.path = Some(audit_path.clone());

    let services = build_services(&config).unwrap();
    let user = services.provisioner.resolve_or_create(identity("ext-1")).unwrap();
    let issued = services.api_keys.issue(&user.id, "ci").unwrap();

    let contents = fs::read_to_string(&audit_path).unwrap();
    let events: Vec<serde_json::Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    let names: Vec<&str> = events.iter().filter_map(|event| event["event"].as_str()).collect();
    assert_eq!(names, vec!["user_provisioned", "api_key_issued"]);
    assert!(!contents.contains(issued.secret.expose()));
}
