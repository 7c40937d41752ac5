// crates/smtrx-core/src/runtime/ledger.rs
// ============================================================================
// Module: Run Ledger
// Description: Idempotent writes and point reads for optimization runs.
// Purpose: Record each run exactly once per (user, operation) key.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! The engine reports a run several times as it progresses; every report is
//! an upsert keyed by `(user_id, operation_id)`. The first write creates the
//! row, later writes replace status and payload while `id` and `created_at`
//! stay fixed. Any status transition is accepted, but a terminal run that is
//! reported as running again is audited as a regression.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::OperationId;
use crate::core::OptimizationRun;
use crate::core::RunStatus;
use crate::core::RunUpsert;
use crate::core::UserId;
use crate::runtime::audit::AuditOutcome;
use crate::runtime::audit::LedgerAuditEvent;
use crate::runtime::error::LedgerError;
use crate::runtime::services::LedgerContext;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum operation identifier length in bytes.
pub const MAX_OPERATION_ID_LENGTH: usize = 256;

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Run ledger service.
#[derive(Debug, Clone)]
pub struct RunLedger {
    /// Shared service dependencies.
    ctx: LedgerContext,
}

impl RunLedger {
    /// Builds the ledger over `ctx`.
    #[must_use]
    pub const fn new(ctx: LedgerContext) -> Self {
        Self {
            ctx,
        }
    }

    /// Creates or fully replaces the run for `(user_id, operation_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Configuration`] without a datastore,
    /// [`LedgerError::Invalid`] for malformed requests, and
    /// [`LedgerError::NotFound`] when the user does not exist.
    pub fn upsert(&self, request: &RunUpsert) -> Result<OptimizationRun, LedgerError> {
        let store = self.ctx.gateway.writable()?;
        validate_upsert(request)?;
        let now = self.ctx.clock.now();
        let outcome = store.upsert_run(request, now)?;
        let action = if outcome.previous_status.is_some() { "updated" } else { "created" };
        self.ctx.audit.record(
            &LedgerAuditEvent::new("run_upserted", now, AuditOutcome::Ok)
                .user(&request.user_id)
                .operation(&request.operation_id)
                .detail(format!("{action}:{}", request.status)),
        );
        if let Some(previous) = outcome.previous_status
            && previous.is_terminal()
            && request.status == RunStatus::Running
        {
            self.ctx.audit.record(
                &LedgerAuditEvent::new("run_status_regressed", now, AuditOutcome::Ok)
                    .user(&request.user_id)
                    .operation(&request.operation_id)
                    .detail(format!("{previous}->{}", request.status)),
            );
        }
        Ok(outcome.run)
    }

    /// Loads the run for `(user_id, operation_id)`.
    ///
    /// # Errors
    ///
    /// Returns datastore failures. An unconfigured ledger yields `Ok(None)`.
    pub fn get(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, LedgerError> {
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(None);
        };
        Ok(store.find_run(user_id, operation_id)?)
    }
}

/// Rejects requests that cannot be stored faithfully.
fn validate_upsert(request: &RunUpsert) -> Result<(), LedgerError> {
    let operation_id = request.operation_id.as_str();
    if operation_id.is_empty() {
        return Err(LedgerError::Invalid("operation_id must be non-empty".to_string()));
    }
    if operation_id.len() > MAX_OPERATION_ID_LENGTH {
        return Err(LedgerError::Invalid(format!(
            "operation_id exceeds {MAX_OPERATION_ID_LENGTH} bytes"
        )));
    }
    for (label, value) in [
        ("optimal_value", request.fields.optimal_value),
        ("execution_time", request.fields.execution_time),
    ] {
        if value.is_some_and(|value| !value.is_finite()) {
            return Err(LedgerError::Invalid(format!("{label} must be finite")));
        }
    }
    Ok(())
}
