// crates/smtrx-config/src/wiring.rs
// ============================================================================
// Module: Service Wiring
// Description: Builds ledger services from validated configuration.
// Purpose: Map config sections onto datastores, audit sinks, and limits.
// Dependencies: smtrx-core, smtrx-store-sqlite
// ============================================================================

//! ## Overview
//! A disabled store produces an unconfigured gateway, so the resulting
//! services fail writes with a configuration error and answer reads with
//! empty results. Datastore and sink initialization failures are reported as
//! [`WiringError::Init`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use smtrx_core::DatastoreGateway;
use smtrx_core::FileAuditSink;
use smtrx_core::InMemoryDatastore;
use smtrx_core::LedgerAuditSink;
use smtrx_core::LedgerContext;
use smtrx_core::LedgerServices;
use smtrx_core::NoopAuditSink;
use smtrx_core::StderrAuditSink;
use smtrx_store_sqlite::SqliteDatastore;
use smtrx_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

use crate::config::AuditConfig;
use crate::config::AuditSinkType;
use crate::config::SmtrxConfig;
use crate::config::StoreConfig;
use crate::config::StoreType;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while wiring services.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Configuration is inconsistent.
    #[error("config error: {0}")]
    Config(String),
    /// A datastore or sink could not be initialized.
    #[error("init error: {0}")]
    Init(String),
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds ready ledger services from `config`.
///
/// # Errors
///
/// Returns [`WiringError`] when the configuration is invalid or a datastore
/// or audit sink cannot be opened.
pub fn build_services(config: &SmtrxConfig) -> Result<LedgerServices, WiringError> {
    config.validate().map_err(|err| WiringError::Config(err.to_string()))?;
    let gateway = build_gateway(&config.store)?;
    let audit = build_audit_sink(&config.audit)?;
    let context = LedgerContext::new(gateway).with_audit(audit);
    Ok(LedgerServices::new(&context, config.query.limits()))
}

/// Builds the datastore gateway from store configuration.
///
/// # Errors
///
/// Returns [`WiringError`] when the `SQLite` datastore cannot be opened.
pub fn build_gateway(config: &StoreConfig) -> Result<DatastoreGateway, WiringError> {
    let gateway = match config.store_type {
        StoreType::Disabled => DatastoreGateway::unconfigured(),
        StoreType::Memory => DatastoreGateway::new(InMemoryDatastore::new()),
        StoreType::Sqlite => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| WiringError::Config("sqlite store requires path".to_string()))?;
            let sqlite_config = SqliteStoreConfig {
                path,
                busy_timeout_ms: config.busy_timeout_ms,
                journal_mode: config.journal_mode,
                sync_mode: config.sync_mode,
            };
            let store = SqliteDatastore::new(&sqlite_config)
                .map_err(|err| WiringError::Init(err.to_string()))?;
            DatastoreGateway::new(store)
        }
    };
    Ok(gateway)
}

/// Builds the audit sink from audit configuration.
///
/// # Errors
///
/// Returns [`WiringError`] when the audit file cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn LedgerAuditSink>, WiringError> {
    let sink: Arc<dyn LedgerAuditSink> = match config.sink {
        AuditSinkType::None => Arc::new(NoopAuditSink),
        AuditSinkType::Stderr => Arc::new(StderrAuditSink),
        AuditSinkType::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| WiringError::Config("file audit sink requires path".to_string()))?;
            let sink = FileAuditSink::new(path).map_err(|err| WiringError::Init(err.to_string()))?;
            Arc::new(sink)
        }
    };
    Ok(sink)
}
