// crates/smtrx-store-sqlite/src/rows.rs
// ============================================================================
// Module: SQLite Row Mapping
// Description: Column lists and row decoders for ledger tables.
// Purpose: Keep SQL column order and Rust field mapping in one place.
// Dependencies: smtrx-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Every `SELECT` in the datastore uses one of the column lists below and the
//! matching decoder. Stored values are untrusted: an unknown status or tier
//! label, or JSON that does not parse, surfaces as a conversion failure that
//! the datastore reports as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use serde_json::Value;
use smtrx_core::ApiKey;
use smtrx_core::ApiKeyId;
use smtrx_core::ExternalId;
use smtrx_core::OperationId;
use smtrx_core::OptimizationRun;
use smtrx_core::RunFields;
use smtrx_core::RunMetrics;
use smtrx_core::RunRecordId;
use smtrx_core::RunStatus;
use smtrx_core::SubscriptionTier;
use smtrx_core::Timestamp;
use smtrx_core::User;
use smtrx_core::UserId;

// ============================================================================
// SECTION: Column Lists
// ============================================================================

/// User columns in decoder order.
pub const USER_COLUMNS: &str = "id, external_id, email, name, subscription_tier, storage_used, \
                                access_count_month, access_reset_at, created_at, updated_at";

/// API key columns in decoder order; the digest is never selected.
pub const API_KEY_COLUMNS: &str =
    "id, user_id, name, key_prefix, last_used_at, created_at, revoked_at, is_active";

/// Number of columns in [`API_KEY_COLUMNS`].
pub const API_KEY_COLUMN_COUNT: usize = 8;

/// Run columns in decoder order.
pub const RUN_COLUMNS: &str = "id, user_id, operation_id, status, problem_id, optimal_solution, \
                               optimal_value, strategy_used, evaluations_used, \
                               convergence_history, execution_time, iterations, success, \
                               error_message, learning_applied, learning_insights, \
                               public_recall_count, private_recall_count, stored_to_public, \
                               stored_to_private, strategy_explanation, configuration, \
                               ai_reasoning_used, context_intelligence_used, domain, \
                               completed_at, created_at";

/// Columns read by the statistics scan.
pub const METRIC_COLUMNS: &str = "status, success, execution_time, evaluations_used";

// ============================================================================
// SECTION: Decoders
// ============================================================================

/// Decodes a user starting at column `base`.
pub fn user_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get::<_, String>(base)?),
        external_id: ExternalId::new(row.get::<_, String>(base + 1)?),
        email: row.get(base + 2)?,
        name: row.get(base + 3)?,
        tier: parse_label::<SubscriptionTier>(row, base + 4)?,
        storage_used: row.get(base + 5)?,
        access_count_month: row.get(base + 6)?,
        access_reset_at: Timestamp::from_unix_millis(row.get(base + 7)?),
        created_at: Timestamp::from_unix_millis(row.get(base + 8)?),
        updated_at: Timestamp::from_unix_millis(row.get(base + 9)?),
    })
}

/// Decodes an API key starting at column 0.
pub fn api_key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: ApiKeyId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        key_prefix: row.get(3)?,
        last_used_at: optional_timestamp(row, 4)?,
        created_at: Timestamp::from_unix_millis(row.get(5)?),
        revoked_at: optional_timestamp(row, 6)?,
        is_active: row.get(7)?,
    })
}

/// Decodes a run.
pub fn run_from_row(row: &Row<'_>) -> rusqlite::Result<OptimizationRun> {
    let fields = RunFields {
        problem_id: row.get(4)?,
        optimal_solution: optional_json(row, 5)?,
        optimal_value: row.get(6)?,
        strategy_used: row.get(7)?,
        evaluations_used: row.get(8)?,
        convergence_history: optional_json(row, 9)?,
        execution_time: row.get(10)?,
        iterations: row.get(11)?,
        success: row.get(12)?,
        error_message: row.get(13)?,
        learning_applied: row.get(14)?,
        learning_insights: optional_json(row, 15)?,
        public_recall_count: row.get(16)?,
        private_recall_count: row.get(17)?,
        stored_to_public: row.get(18)?,
        stored_to_private: row.get(19)?,
        strategy_explanation: row.get(20)?,
        configuration: optional_json(row, 21)?,
        ai_reasoning_used: row.get(22)?,
        context_intelligence_used: row.get(23)?,
        domain: row.get(24)?,
        completed_at: optional_timestamp(row, 25)?,
    };
    Ok(OptimizationRun {
        id: RunRecordId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        operation_id: OperationId::new(row.get::<_, String>(2)?),
        status: parse_label::<RunStatus>(row, 3)?,
        fields,
        created_at: Timestamp::from_unix_millis(row.get(26)?),
    })
}

/// Decodes a statistics row.
pub fn metrics_from_row(row: &Row<'_>) -> rusqlite::Result<RunMetrics> {
    Ok(RunMetrics {
        status: parse_label::<RunStatus>(row, 0)?,
        success: row.get(1)?,
        execution_time: row.get(2)?,
        evaluations_used: row.get(3)?,
    })
}

// ============================================================================
// SECTION: Encoders
// ============================================================================

/// Serializes an optional JSON column.
///
/// # Errors
///
/// Returns the serializer error message when the value cannot be encoded.
pub fn encode_json(value: Option<&Value>) -> Result<Option<String>, String> {
    value.map(serde_json::to_string).transpose().map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a stored text label.
fn parse_label<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let label: String = row.get(index)?;
    label.parse::<T>().map_err(|err| conversion_failure(index, err))
}

/// Reads a nullable millisecond timestamp.
fn optional_timestamp(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Timestamp>> {
    Ok(row.get::<_, Option<i64>>(index)?.map(Timestamp::from_unix_millis))
}

/// Reads a nullable JSON text column.
fn optional_json(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Value>> {
    let Some(text) = row.get::<_, Option<String>>(index)? else {
        return Ok(None);
    };
    serde_json::from_str(&text).map(Some).map_err(|err| conversion_failure(index, err.to_string()))
}

/// Qualifies every column in `columns` with `alias`.
pub fn qualified(columns: &str, alias: &str) -> String {
    columns.split(',').map(|column| format!("{alias}.{}", column.trim())).collect::<Vec<_>>().join(", ")
}

/// Builds a conversion failure for column `index`.
fn conversion_failure(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}
