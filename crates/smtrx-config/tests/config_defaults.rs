// crates/smtrx-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Loading Tests
// Description: Default values and file loading rules for smtrx.toml.
// Purpose: Ensure empty configs are safe and loading enforces hard limits.
// =============================================================================

//! Config default and loader tests for smtrx-config.

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
use std::path::PathBuf;

use smtrx_config::AuditSinkType;
use smtrx_config::ConfigError;
use smtrx_config::MAX_CONFIG_FILE_SIZE;
use smtrx_config::SmtrxConfig;
use smtrx_config::StoreType;
use smtrx_core::QueryLimits;
use smtrx_store_sqlite::SqliteStoreMode;
use smtrx_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

use crate::common::TestResult;
use crate::common::assert_invalid;

#[test]
fn empty_config_uses_safe_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    assert_eq!(config.store.store_type, StoreType::Disabled);
    assert!(config.store.path.is_none());
    assert_eq!(config.store.busy_timeout_ms, 5_000);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Wal);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Full);
    assert_eq!(config.query.limits(), QueryLimits::default());
    assert_eq!(config.audit.sink, AuditSinkType::None);
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn full_config_parses_every_section() -> TestResult {
    let config = common::config_from_toml(
        r#"
        [store]
        type = "sqlite"
        path = "data/ledger.sqlite"
        busy_timeout_ms = 250
        journal_mode = "delete"
        sync_mode = "normal"

        [query]
        default_limit = 10
        max_limit = 50

        [audit]
        sink = "file"
        path = "logs/audit.jsonl"
        "#,
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.store.store_type, StoreType::Sqlite);
    assert_eq!(config.store.path, Some(PathBuf::from("data/ledger.sqlite")));
    assert_eq!(config.store.busy_timeout_ms, 250);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Delete);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Normal);
    assert_eq!(config.query.default_limit, 10);
    assert_eq!(config.query.max_limit, 50);
    assert_eq!(config.audit.sink, AuditSinkType::File);
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn unknown_store_type_is_a_parse_error() {
    let result = common::config_from_toml("[store]\ntype = \"postgres\"\n");
    assert!(result.is_err());
}

#[test]
fn load_reads_explicit_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("smtrx.toml");
    fs::write(&path, "[store]\ntype = \"memory\"\n\n[query]\ndefault_limit = 5\n").unwrap();

    let config = SmtrxConfig::load(Some(&path)).unwrap();
    assert_eq!(config.store.store_type, StoreType::Memory);
    assert_eq!(config.query.default_limit, 5);
    assert_eq!(config.query.max_limit, 100);
}

#[test]
fn load_reports_missing_file_as_io() {
    let temp = TempDir::new().unwrap();
    let result = SmtrxConfig::load(Some(&temp.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(MAX_CONFIG_FILE_SIZE));
    fs::write(&path, padding).unwrap();
    assert_invalid(SmtrxConfig::load(Some(&path)), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("binary.toml");
    fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    assert_invalid(SmtrxConfig::load(Some(&path)), "config file must be utf-8")
}

#[test]
fn load_rejects_long_path_component() -> TestResult {
    let path = PathBuf::from(format!("{}.toml", "c".repeat(300)));
    assert_invalid(SmtrxConfig::load(Some(&path)), "config path component too long")
}

#[test]
fn load_reports_syntax_errors_as_parse() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "[store\ntype = ").unwrap();
    let result = SmtrxConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_validates_after_parsing() -> TestResult {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("invalid.toml");
    fs::write(&path, "[store]\ntype = \"sqlite\"\n").unwrap();
    assert_invalid(SmtrxConfig::load(Some(&path)), "sqlite store requires path")
}
