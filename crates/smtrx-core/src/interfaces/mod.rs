// crates/smtrx-core/src/interfaces/mod.rs
// ============================================================================
// Module: Datastore Interfaces
// Description: Backend-agnostic persistence contracts for the ledger.
// Purpose: Define the capability surface every datastore must provide.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The ledger talks to storage only through these traits. Implementations must
//! enforce uniqueness themselves (unique indexes, not check-then-insert) for
//! `users.external_id`, `api_keys.key_hash`, and runs keyed by
//! `(user_id, operation_id)`, and report violations as
//! [`StoreError::Conflict`]. Writes referencing a user that does not exist are
//! reported as [`StoreError::NotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ApiKey;
use crate::core::ApiKeyId;
use crate::core::ExternalId;
use crate::core::NewApiKey;
use crate::core::OperationId;
use crate::core::OptimizationRun;
use crate::core::PageWindow;
use crate::core::RunFilters;
use crate::core::RunMetrics;
use crate::core::RunPage;
use crate::core::RunSort;
use crate::core::RunStatus;
use crate::core::RunUpsert;
use crate::core::Timestamp;
use crate::core::User;
use crate::core::UserId;
use crate::core::ValidatedKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Datastore errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("datastore io error: {0}")]
    Io(String),
    /// Store engine error.
    #[error("datastore error: {0}")]
    Store(String),
    /// Uniqueness constraint violated.
    #[error("datastore conflict: {0}")]
    Conflict(String),
    /// Write referenced a row that does not exist.
    #[error("datastore missing reference: {0}")]
    NotFound(String),
    /// Stored data is unreadable.
    #[error("datastore corruption: {0}")]
    Corrupt(String),
    /// Stored schema version is incompatible.
    #[error("datastore version mismatch: {0}")]
    VersionMismatch(String),
    /// Input rejected by the datastore.
    #[error("datastore invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Persistence for user records.
pub trait UserStore {
    /// Looks a user up by external identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_user_by_external_id(&self, external_id: &ExternalId)
    -> Result<Option<User>, StoreError>;

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the external identity already has a user.
    fn insert_user(&self, user: &User) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: API Keys
// ============================================================================

/// Persistence for API key records.
pub trait ApiKeyStore {
    /// Inserts a freshly issued key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the digest already exists and
    /// [`StoreError::NotFound`] when the owning user does not exist.
    fn insert_api_key(&self, key: &NewApiKey) -> Result<ApiKey, StoreError>;

    /// Finds an active key by digest, joined to its owner.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ValidatedKey>, StoreError>;

    /// Records a successful validation time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn touch_api_key(&self, key_id: &ApiKeyId, at: Timestamp) -> Result<(), StoreError>;

    /// Revokes a key in one conditional update scoped to its owner.
    ///
    /// Returns `None` when no key matches both `key_id` and `user_id`. An
    /// already revoked key keeps its original `revoked_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn revoke_api_key(
        &self,
        user_id: &UserId,
        key_id: &ApiKeyId,
        at: Timestamp,
    ) -> Result<Option<ApiKey>, StoreError>;

    /// Lists every key owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_api_keys(&self, user_id: &UserId) -> Result<Vec<ApiKey>, StoreError>;
}

// ============================================================================
// SECTION: Runs
// ============================================================================

/// Result of an idempotent run write.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// The stored row after the write.
    pub run: OptimizationRun,
    /// Status held before the write; `None` when the row was created.
    pub previous_status: Option<RunStatus>,
}

/// Persistence for optimization runs.
pub trait RunStore {
    /// Inserts or fully replaces the run keyed by `(user_id, operation_id)`.
    ///
    /// `now` becomes `created_at` only when the row is created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the owning user does not exist.
    fn upsert_run(&self, request: &RunUpsert, now: Timestamp)
    -> Result<UpsertOutcome, StoreError>;

    /// Loads a single run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_run(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, StoreError>;

    /// Returns one filtered, ordered page and the filtered row count.
    ///
    /// Ties on the sort column are broken by insertion order in the sort
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn query_runs(
        &self,
        user_id: &UserId,
        filters: &RunFilters,
        sort: RunSort,
        window: PageWindow,
    ) -> Result<RunPage, StoreError>;

    /// Scans the statistics columns of every run owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn run_metrics(&self, user_id: &UserId) -> Result<Vec<RunMetrics>, StoreError>;
}

// ============================================================================
// SECTION: Datastore
// ============================================================================

/// Complete datastore capability consumed by the ledger services.
pub trait Datastore: UserStore + ApiKeyStore + RunStore + Send + Sync {}

impl<T> Datastore for T where T: UserStore + ApiKeyStore + RunStore + Send + Sync {}
