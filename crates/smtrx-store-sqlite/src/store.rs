// crates/smtrx-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Datastore
// Description: Durable users, API keys, and run ledger backed by SQLite.
// Purpose: Persist ledger rows with uniqueness enforced by the database.
// Dependencies: smtrx-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements the ledger [`Datastore`](smtrx_core::Datastore)
//! traits on a single `SQLite` connection. Uniqueness of
//! `users.external_id`, `api_keys.key_hash`, and
//! `optimization_results(user_id, operation_id)` is enforced by unique
//! indexes, and ownership by foreign keys; the datastore never relies on
//! check-then-insert. Run upserts and key revocations are single statements
//! inside a transaction. Security posture: database contents are untrusted
//! and decode failures surface as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::functions::FunctionFlags;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use smtrx_core::ApiKey;
use smtrx_core::ApiKeyId;
use smtrx_core::ApiKeyStore;
use smtrx_core::ExternalId;
use smtrx_core::NewApiKey;
use smtrx_core::OperationId;
use smtrx_core::OptimizationRun;
use smtrx_core::PageWindow;
use smtrx_core::RunFilters;
use smtrx_core::RunMetrics;
use smtrx_core::RunPage;
use smtrx_core::RunRecordId;
use smtrx_core::RunSort;
use smtrx_core::RunStatus;
use smtrx_core::RunStore;
use smtrx_core::RunUpsert;
use smtrx_core::SortDirection;
use smtrx_core::StoreError;
use smtrx_core::Timestamp;
use smtrx_core::UpsertOutcome;
use smtrx_core::User;
use smtrx_core::UserId;
use smtrx_core::UserStore;
use smtrx_core::ValidatedKey;
use smtrx_core::fold_case;
use thiserror::Error;

use crate::rows::API_KEY_COLUMNS;
use crate::rows::API_KEY_COLUMN_COUNT;
use crate::rows::METRIC_COLUMNS;
use crate::rows::RUN_COLUMNS;
use crate::rows::USER_COLUMNS;
use crate::rows::api_key_from_row;
use crate::rows::encode_json;
use crate::rows::metrics_from_row;
use crate::rows::qualified;
use crate::rows::run_from_row;
use crate::rows::user_from_row;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the datastore.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// SQL function applying the ledger's Unicode case folding.
const FOLD_CASE_FN: &str = "smtrx_fold_case";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger datastore.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a configuration for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` datastore errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Unique index violated.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Foreign key violated.
    #[error("sqlite store missing reference: {0}")]
    MissingReference(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::MissingReference(message) => Self::NotFound(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a write failure, classifying constraint violations.
fn write_error(err: rusqlite::Error, subject: &str) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err
        && failure.code == ErrorCode::ConstraintViolation
    {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
            return SqliteStoreError::MissingReference(format!("{subject} references unknown user"));
        }
        return SqliteStoreError::Conflict(format!("{subject} already exists"));
    }
    SqliteStoreError::Db(err.to_string())
}

/// Maps a read failure, classifying undecodable rows as corruption.
fn read_error(err: rusqlite::Error) -> SqliteStoreError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => SqliteStoreError::Corrupt(err.to_string()),
        other => SqliteStoreError::Db(other.to_string()),
    }
}

// ============================================================================
// SECTION: Datastore
// ============================================================================

/// `SQLite`-backed ledger datastore.
#[derive(Clone)]
pub struct SqliteDatastore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDatastore {
    /// Opens (creating when absent) an `SQLite` ledger datastore.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when its schema version is unsupported.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads a user by external identity.
    fn load_user(&self, external_id: &ExternalId) -> Result<Option<User>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1"),
                params![external_id.as_str()],
                |row| user_from_row(row, 0),
            )
            .optional()
            .map_err(read_error)
    }

    /// Inserts a user row.
    fn save_user(&self, user: &User) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
                     ?9, ?10)"
                ),
                params![
                    user.id.as_str(),
                    user.external_id.as_str(),
                    user.email,
                    user.name,
                    user.tier.as_str(),
                    user.storage_used,
                    user.access_count_month,
                    user.access_reset_at.as_unix_millis(),
                    user.created_at.as_unix_millis(),
                    user.updated_at.as_unix_millis(),
                ],
            )
            .map_err(|err| write_error(err, "user"))?;
        Ok(())
    }

    /// Inserts a freshly issued key row.
    fn save_api_key(&self, key: &NewApiKey) -> Result<ApiKey, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO api_keys (id, user_id, name, key_prefix, key_hash, last_used_at, \
                 created_at, revoked_at, is_active) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, NULL, 1)",
                params![
                    key.id.as_str(),
                    key.user_id.as_str(),
                    key.name,
                    key.key_prefix,
                    key.key_hash,
                    key.created_at.as_unix_millis(),
                ],
            )
            .map_err(|err| write_error(err, "api key"))?;
        Ok(ApiKey::from(key.clone()))
    }

    /// Loads an active key and its owner by digest.
    fn load_active_api_key(&self, key_hash: &str) -> Result<Option<ValidatedKey>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                &format!(
                    "SELECT {}, {} FROM api_keys k JOIN users u ON u.id = k.user_id WHERE \
                     k.key_hash = ?1 AND k.is_active = 1",
                    qualified(API_KEY_COLUMNS, "k"),
                    qualified(USER_COLUMNS, "u"),
                ),
                params![key_hash],
                |row| {
                    Ok(ValidatedKey {
                        key: api_key_from_row(row)?,
                        user: user_from_row(row, API_KEY_COLUMN_COUNT)?,
                    })
                },
            )
            .optional()
            .map_err(read_error)
    }

    /// Records a validation time.
    fn mark_api_key_used(&self, key_id: &ApiKeyId, at: Timestamp) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "UPDATE api_keys SET last_used_at = ?2 WHERE id = ?1",
                params![key_id.as_str(), at.as_unix_millis()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Revokes a key owned by `user_id` in one conditional update.
    fn revoke(
        &self,
        user_id: &UserId,
        key_id: &ApiKeyId,
        at: Timestamp,
    ) -> Result<Option<ApiKey>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                &format!(
                    "UPDATE api_keys SET is_active = 0, revoked_at = COALESCE(revoked_at, ?3) \
                     WHERE id = ?1 AND user_id = ?2 RETURNING {API_KEY_COLUMNS}"
                ),
                params![key_id.as_str(), user_id.as_str(), at.as_unix_millis()],
                api_key_from_row,
            )
            .optional()
            .map_err(read_error)
    }

    /// Lists a user's keys newest first.
    fn load_api_keys(&self, user_id: &UserId) -> Result<Vec<ApiKey>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(&format!(
                "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE user_id = ?1 ORDER BY created_at \
                 DESC, rowid DESC"
            ))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![user_id.as_str()], api_key_from_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(read_error)
    }

    /// Inserts or replaces a run and reports the prior status.
    fn save_run(
        &self,
        request: &RunUpsert,
        now: Timestamp,
    ) -> Result<UpsertOutcome, SqliteStoreError> {
        let fields = &request.fields;
        let optimal_solution =
            encode_json(fields.optimal_solution.as_ref()).map_err(SqliteStoreError::Invalid)?;
        let convergence_history =
            encode_json(fields.convergence_history.as_ref()).map_err(SqliteStoreError::Invalid)?;
        let learning_insights =
            encode_json(fields.learning_insights.as_ref()).map_err(SqliteStoreError::Invalid)?;
        let configuration =
            encode_json(fields.configuration.as_ref()).map_err(SqliteStoreError::Invalid)?;

        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT status FROM optimization_results WHERE user_id = ?1 AND operation_id = ?2",
                params![request.user_id.as_str(), request.operation_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let previous_status = previous
            .map(|label| label.parse::<RunStatus>().map_err(SqliteStoreError::Corrupt))
            .transpose()?;
        let run = tx
            .query_row(
                &format!(
                    "INSERT INTO optimization_results ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, \
                     ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, \
                     ?21, ?22, ?23, ?24, ?25, ?26, ?27)
                     ON CONFLICT(user_id, operation_id) DO UPDATE SET
                        status = excluded.status,
                        problem_id = excluded.problem_id,
                        optimal_solution = excluded.optimal_solution,
                        optimal_value = excluded.optimal_value,
                        strategy_used = excluded.strategy_used,
                        evaluations_used = excluded.evaluations_used,
                        convergence_history = excluded.convergence_history,
                        execution_time = excluded.execution_time,
                        iterations = excluded.iterations,
                        success = excluded.success,
                        error_message = excluded.error_message,
                        learning_applied = excluded.learning_applied,
                        learning_insights = excluded.learning_insights,
                        public_recall_count = excluded.public_recall_count,
                        private_recall_count = excluded.private_recall_count,
                        stored_to_public = excluded.stored_to_public,
                        stored_to_private = excluded.stored_to_private,
                        strategy_explanation = excluded.strategy_explanation,
                        configuration = excluded.configuration,
                        ai_reasoning_used = excluded.ai_reasoning_used,
                        context_intelligence_used = excluded.context_intelligence_used,
                        domain = excluded.domain,
                        completed_at = excluded.completed_at
                     RETURNING {RUN_COLUMNS}"
                ),
                params![
                    RunRecordId::generate().as_str(),
                    request.user_id.as_str(),
                    request.operation_id.as_str(),
                    request.status.as_str(),
                    fields.problem_id,
                    optimal_solution,
                    fields.optimal_value,
                    fields.strategy_used,
                    fields.evaluations_used,
                    convergence_history,
                    fields.execution_time,
                    fields.iterations,
                    fields.success,
                    fields.error_message,
                    fields.learning_applied,
                    learning_insights,
                    fields.public_recall_count,
                    fields.private_recall_count,
                    fields.stored_to_public,
                    fields.stored_to_private,
                    fields.strategy_explanation,
                    configuration,
                    fields.ai_reasoning_used,
                    fields.context_intelligence_used,
                    fields.domain,
                    fields.completed_at.map(Timestamp::as_unix_millis),
                    now.as_unix_millis(),
                ],
                run_from_row,
            )
            .map_err(|err| match err {
                rusqlite::Error::SqliteFailure(..) => write_error(err, "run"),
                other => read_error(other),
            })?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(UpsertOutcome {
            run,
            previous_status,
        })
    }

    /// Loads one run.
    fn load_run(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM optimization_results WHERE user_id = ?1 AND \
                     operation_id = ?2"
                ),
                params![user_id.as_str(), operation_id.as_str()],
                run_from_row,
            )
            .optional()
            .map_err(read_error)
    }

    /// Counts and pages runs matching `filters`.
    fn load_run_page(
        &self,
        user_id: &UserId,
        filters: &RunFilters,
        sort: RunSort,
        window: PageWindow,
    ) -> Result<RunPage, SqliteStoreError> {
        let (predicate, mut values) = run_predicate(user_id, filters);
        let direction = match sort.direction {
            SortDirection::Asc => "ASC NULLS LAST",
            SortDirection::Desc => "DESC NULLS FIRST",
        };
        let tiebreak = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let offset = i64::try_from(window.offset())
            .map_err(|_| SqliteStoreError::Invalid("page offset too large".to_string()))?;

        let guard = self.lock()?;
        let total: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM optimization_results WHERE {predicate}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        values.push(SqlValue::Integer(i64::from(window.limit)));
        values.push(SqlValue::Integer(offset));
        let mut stmt = guard
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM optimization_results WHERE {predicate} ORDER BY {} \
                 {direction}, rowid {tiebreak} LIMIT ? OFFSET ?",
                sort.field.column(),
            ))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), run_from_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let runs = rows.collect::<Result<Vec<_>, _>>().map_err(read_error)?;
        Ok(RunPage {
            runs,
            total: u64::try_from(total)
                .map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))?,
        })
    }

    /// Reads the statistics columns of every run owned by `user_id`.
    fn load_run_metrics(&self, user_id: &UserId) -> Result<Vec<RunMetrics>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(&format!("SELECT {METRIC_COLUMNS} FROM optimization_results WHERE user_id = ?1"))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![user_id.as_str()], metrics_from_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(read_error)
    }
}

// ============================================================================
// SECTION: Trait Implementations
// ============================================================================

impl UserStore for SqliteDatastore {
    fn find_user_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, StoreError> {
        self.load_user(external_id).map_err(StoreError::from)
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.save_user(user).map_err(StoreError::from)
    }
}

impl ApiKeyStore for SqliteDatastore {
    fn insert_api_key(&self, key: &NewApiKey) -> Result<ApiKey, StoreError> {
        self.save_api_key(key).map_err(StoreError::from)
    }

    fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ValidatedKey>, StoreError> {
        self.load_active_api_key(key_hash).map_err(StoreError::from)
    }

    fn touch_api_key(&self, key_id: &ApiKeyId, at: Timestamp) -> Result<(), StoreError> {
        self.mark_api_key_used(key_id, at).map_err(StoreError::from)
    }

    fn revoke_api_key(
        &self,
        user_id: &UserId,
        key_id: &ApiKeyId,
        at: Timestamp,
    ) -> Result<Option<ApiKey>, StoreError> {
        self.revoke(user_id, key_id, at).map_err(StoreError::from)
    }

    fn list_api_keys(&self, user_id: &UserId) -> Result<Vec<ApiKey>, StoreError> {
        self.load_api_keys(user_id).map_err(StoreError::from)
    }
}

impl RunStore for SqliteDatastore {
    fn upsert_run(
        &self,
        request: &RunUpsert,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        self.save_run(request, now).map_err(StoreError::from)
    }

    fn find_run(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, StoreError> {
        self.load_run(user_id, operation_id).map_err(StoreError::from)
    }

    fn query_runs(
        &self,
        user_id: &UserId,
        filters: &RunFilters,
        sort: RunSort,
        window: PageWindow,
    ) -> Result<RunPage, StoreError> {
        self.load_run_page(user_id, filters, sort, window).map_err(StoreError::from)
    }

    fn run_metrics(&self, user_id: &UserId) -> Result<Vec<RunMetrics>, StoreError> {
        self.load_run_metrics(user_id).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the `WHERE` clause and positional values for run filters.
///
/// Search uses `instr` on text folded by [`FOLD_CASE_FN`], so `%` and `_`
/// match literally and non-ASCII letters compare case-insensitively.
fn run_predicate(user_id: &UserId, filters: &RunFilters) -> (String, Vec<SqlValue>) {
    let mut clauses = vec!["user_id = ?"];
    let mut values = vec![SqlValue::Text(user_id.to_string())];
    if let Some(status) = filters.status {
        clauses.push("status = ?");
        values.push(SqlValue::Text(status.as_str().to_string()));
    }
    if let Some(strategy) = &filters.strategy {
        clauses.push("strategy_used = ?");
        values.push(SqlValue::Text(strategy.clone()));
    }
    if let Some(start) = filters.start_date {
        clauses.push("created_at >= ?");
        values.push(SqlValue::Integer(start.as_unix_millis()));
    }
    if let Some(end) = filters.end_date {
        clauses.push("created_at <= ?");
        values.push(SqlValue::Integer(end.as_unix_millis()));
    }
    if let Some(search) = &filters.search {
        clauses.push("instr(smtrx_fold_case(problem_id), smtrx_fold_case(?)) > 0");
        values.push(SqlValue::Text(search.clone()));
    }
    (clauses.join(" AND "), values)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    register_functions(&connection)?;
    Ok(connection)
}

/// Registers the scalar functions used by run queries.
fn register_functions(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .create_scalar_function(
            FOLD_CASE_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: Option<String> = ctx.get(0)?;
                Ok(text.map(|value| fold_case(&value)))
            },
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Applies `SQLite` pragmas required for durability and referential integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    external_id TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL,
                    name TEXT,
                    subscription_tier TEXT NOT NULL DEFAULT 'free',
                    storage_used INTEGER NOT NULL DEFAULT 0,
                    access_count_month INTEGER NOT NULL DEFAULT 0,
                    access_reset_at INTEGER NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS api_keys (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    key_prefix TEXT NOT NULL,
                    key_hash TEXT NOT NULL UNIQUE,
                    last_used_at INTEGER,
                    created_at INTEGER NOT NULL,
                    revoked_at INTEGER,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_api_keys_user_id
                    ON api_keys (user_id, created_at);
                CREATE TABLE IF NOT EXISTS optimization_results (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    operation_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    problem_id TEXT,
                    optimal_solution TEXT,
                    optimal_value REAL,
                    strategy_used TEXT,
                    evaluations_used INTEGER,
                    convergence_history TEXT,
                    execution_time REAL,
                    iterations INTEGER,
                    success INTEGER,
                    error_message TEXT,
                    learning_applied INTEGER NOT NULL DEFAULT 0,
                    learning_insights TEXT,
                    public_recall_count INTEGER NOT NULL DEFAULT 0,
                    private_recall_count INTEGER NOT NULL DEFAULT 0,
                    stored_to_public INTEGER NOT NULL DEFAULT 0,
                    stored_to_private INTEGER NOT NULL DEFAULT 0,
                    strategy_explanation TEXT,
                    configuration TEXT,
                    ai_reasoning_used INTEGER NOT NULL DEFAULT 0,
                    context_intelligence_used INTEGER NOT NULL DEFAULT 0,
                    domain TEXT,
                    completed_at INTEGER,
                    created_at INTEGER NOT NULL,
                    UNIQUE (user_id, operation_id),
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_optimization_results_user_created
                    ON optimization_results (user_id, created_at);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
