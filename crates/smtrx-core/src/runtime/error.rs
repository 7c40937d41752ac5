// crates/smtrx-core/src/runtime/error.rs
// ============================================================================
// Module: Ledger Errors
// Description: Error taxonomy surfaced by the ledger services.
// Purpose: Map datastore failures onto caller-facing categories.
// Dependencies: crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! Services surface every failure verbatim; nothing is retried. Resources owned
//! by another user are reported exactly like missing ones so callers cannot
//! probe for the existence of foreign keys or runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by ledger services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No datastore is configured.
    #[error("ledger datastore is not configured")]
    Configuration,
    /// Resource is missing or not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),
    /// Uniqueness constraint violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// Caller input rejected before reaching the datastore.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// Any other datastore failure, unmodified.
    #[error(transparent)]
    UpstreamStore(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => Self::ConstraintViolation(message),
            StoreError::NotFound(message) => Self::NotFound(message),
            other => Self::UpstreamStore(other),
        }
    }
}
