// crates/smtrx-core/src/runtime/services.rs
// ============================================================================
// Module: Ledger Services
// Description: Shared service context and the assembled service bundle.
// Purpose: Build every ledger service over one gateway, clock, and audit sink.
// Dependencies: crate::runtime
// ============================================================================

//! ## Overview
//! Services are cheap handles over a [`LedgerContext`]: the datastore gateway,
//! the clock that stamps records, and the audit sink. [`LedgerServices`] wires
//! one of each service over a single context so they always agree on which
//! datastore is in use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::core::Clock;
use crate::core::SystemClock;
use crate::runtime::audit::LedgerAuditSink;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::gateway::DatastoreGateway;
use crate::runtime::keys::ApiKeyService;
use crate::runtime::ledger::RunLedger;
use crate::runtime::provisioner::UserProvisioner;
use crate::runtime::query::QueryLimits;
use crate::runtime::query::RunQueryEngine;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Dependencies shared by every ledger service.
#[derive(Clone)]
pub struct LedgerContext {
    /// Datastore access.
    pub gateway: DatastoreGateway,
    /// Time source for record timestamps.
    pub clock: Arc<dyn Clock>,
    /// Audit event sink.
    pub audit: Arc<dyn LedgerAuditSink>,
}

impl LedgerContext {
    /// Builds a context with the system clock and no audit output.
    #[must_use]
    pub fn new(gateway: DatastoreGateway) -> Self {
        Self {
            gateway,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn LedgerAuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

impl fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerContext").field("gateway", &self.gateway).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Service Bundle
// ============================================================================

/// Every ledger service, sharing one context.
#[derive(Debug, Clone)]
pub struct LedgerServices {
    /// User provisioning.
    pub provisioner: UserProvisioner,
    /// API key lifecycle.
    pub api_keys: ApiKeyService,
    /// Run ledger writes and point reads.
    pub runs: RunLedger,
    /// Run listings and statistics.
    pub queries: RunQueryEngine,
}

impl LedgerServices {
    /// Builds every service over `context`.
    #[must_use]
    pub fn new(context: &LedgerContext, limits: QueryLimits) -> Self {
        Self {
            provisioner: UserProvisioner::new(context.clone()),
            api_keys: ApiKeyService::new(context.clone()),
            runs: RunLedger::new(context.clone()),
            queries: RunQueryEngine::new(context.clone(), limits),
        }
    }

    /// Returns true when the services are backed by a datastore.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.provisioner.is_configured()
    }
}
