// crates/smtrx-core/src/runtime/mod.rs
// ============================================================================
// Module: Ledger Runtime
// Description: Credential, provisioning, and run-ledger services.
// Purpose: Implement ledger operations on top of the datastore interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime services hold no state of their own beyond a shared
//! [`LedgerContext`]; every durable fact lives in the datastore. All surfaces
//! built on this crate must go through these services so validation, audit,
//! and error mapping stay uniform.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod ledger;
pub mod provisioner;
pub mod query;
pub mod services;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditOutcome;
pub use audit::FileAuditSink;
pub use audit::LedgerAuditEvent;
pub use audit::LedgerAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use error::LedgerError;
pub use gateway::DatastoreGateway;
pub use keys::ApiKeyService;
pub use keys::IssuedApiKey;
pub use ledger::RunLedger;
pub use provisioner::UserProvisioner;
pub use query::DEFAULT_MAX_PAGE_LIMIT;
pub use query::DEFAULT_PAGE_LIMIT;
pub use query::QueryLimits;
pub use query::RunQuery;
pub use query::RunQueryEngine;
pub use services::LedgerContext;
pub use services::LedgerServices;
pub use store::InMemoryDatastore;
