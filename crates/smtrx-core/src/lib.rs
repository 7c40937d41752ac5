// crates/smtrx-core/src/lib.rs
// ============================================================================
// Module: SMTRX Ledger Core Library
// Description: Public API surface for the credential and run-ledger core.
// Purpose: Expose core types, datastore interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! SMTRX ledger core authenticates API callers, provisions users from an
//! external identity provider, and records optimization runs idempotently.
//! It is backend-agnostic: persistence is reached only through the
//! [`interfaces`] traits, with an in-memory datastore bundled for tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ApiKeyStore;
pub use interfaces::Datastore;
pub use interfaces::RunStore;
pub use interfaces::StoreError;
pub use interfaces::UpsertOutcome;
pub use interfaces::UserStore;
pub use runtime::ApiKeyService;
pub use runtime::AuditOutcome;
pub use runtime::DEFAULT_MAX_PAGE_LIMIT;
pub use runtime::DEFAULT_PAGE_LIMIT;
pub use runtime::DatastoreGateway;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryDatastore;
pub use runtime::IssuedApiKey;
pub use runtime::LedgerAuditEvent;
pub use runtime::LedgerAuditSink;
pub use runtime::LedgerContext;
pub use runtime::LedgerError;
pub use runtime::LedgerServices;
pub use runtime::NoopAuditSink;
pub use runtime::QueryLimits;
pub use runtime::RunLedger;
pub use runtime::RunQuery;
pub use runtime::RunQueryEngine;
pub use runtime::StderrAuditSink;
pub use runtime::UserProvisioner;
