// crates/smtrx-core/src/core/run.rs
// ============================================================================
// Module: Optimization Run Records
// Description: Ledger rows describing one optimization execution each.
// Purpose: Define run status, the replaceable payload, and the upsert request.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A run is keyed by `(user_id, operation_id)`. Everything a caller may send
//! besides the key and status lives in [`RunFields`], and an upsert replaces
//! that struct wholesale: omitted values become `None`/defaults rather than
//! keeping what an earlier write stored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::OperationId;
use crate::core::identifiers::RunRecordId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Lifecycle status of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The engine is still working.
    Running,
    /// The engine finished.
    Completed,
    /// The engine gave up with an error.
    Failed,
    /// The caller cancelled the run.
    Cancelled,
}

impl RunStatus {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for statuses that end a run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Run Payload
// ============================================================================

/// Caller-supplied run attributes, replaced as a whole on every upsert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFields {
    /// Problem identifier, used by free-text search.
    pub problem_id: Option<String>,
    /// Best solution vector found.
    pub optimal_solution: Option<Value>,
    /// Objective value at the best solution.
    pub optimal_value: Option<f64>,
    /// Strategy identifier chosen by the engine.
    pub strategy_used: Option<String>,
    /// Objective evaluations consumed.
    pub evaluations_used: Option<i64>,
    /// Convergence trace.
    pub convergence_history: Option<Value>,
    /// Wall time spent, in the engine's reporting unit.
    pub execution_time: Option<f64>,
    /// Iterations performed.
    pub iterations: Option<i64>,
    /// Engine success flag.
    pub success: Option<bool>,
    /// Failure description.
    pub error_message: Option<String>,
    /// Whether learned priors were applied.
    pub learning_applied: bool,
    /// Free-form learning insights.
    pub learning_insights: Option<Value>,
    /// Recalls served from the public store.
    pub public_recall_count: i64,
    /// Recalls served from the private store.
    pub private_recall_count: i64,
    /// Whether the result was stored publicly.
    pub stored_to_public: bool,
    /// Whether the result was stored privately.
    pub stored_to_private: bool,
    /// Narrative explanation of the strategy choice.
    pub strategy_explanation: Option<String>,
    /// Free-form engine configuration.
    pub configuration: Option<Value>,
    /// Whether AI reasoning informed the run.
    pub ai_reasoning_used: bool,
    /// Whether context intelligence informed the run.
    pub context_intelligence_used: bool,
    /// Domain tag.
    pub domain: Option<String>,
    /// Completion time reported by the engine.
    pub completed_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Stored optimization run.
///
/// # Invariants
/// - `(user_id, operation_id)` is unique.
/// - `id` and `created_at` are fixed by the first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRun {
    /// Record identifier.
    pub id: RunRecordId,
    /// Owning user.
    pub user_id: UserId,
    /// Caller correlation identifier.
    pub operation_id: OperationId,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Replaceable payload.
    #[serde(flatten)]
    pub fields: RunFields,
    /// First write time.
    pub created_at: Timestamp,
}

/// Idempotent write request for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunUpsert {
    /// Owning user; the ledger trusts the caller to supply the right one.
    pub user_id: UserId,
    /// Caller correlation identifier.
    pub operation_id: OperationId,
    /// Status to store.
    pub status: RunStatus,
    /// Payload that replaces any previously stored payload.
    pub fields: RunFields,
}
