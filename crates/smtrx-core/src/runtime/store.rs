// crates/smtrx-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Ledger Datastore
// Description: Mutex-guarded datastore for tests and local development.
// Purpose: Provide a deterministic datastore with the same constraints as SQL.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryDatastore`] keeps users, keys, and runs behind a single mutex so
//! every check-and-write is atomic, mirroring the unique indexes and foreign
//! keys of the SQL datastores. Keys and runs are kept in insertion order,
//! which is the tie-breaker for ordering. It is not intended for production
//! use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

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
use crate::core::RunRecordId;
use crate::core::RunSort;
use crate::core::RunUpsert;
use crate::core::Timestamp;
use crate::core::User;
use crate::core::UserId;
use crate::core::ValidatedKey;
use crate::interfaces::ApiKeyStore;
use crate::interfaces::RunStore;
use crate::interfaces::StoreError;
use crate::interfaces::UpsertOutcome;
use crate::interfaces::UserStore;

// ============================================================================
// SECTION: State
// ============================================================================

/// Stored key row, digest included.
#[derive(Debug, Clone)]
struct StoredKey {
    /// Digest of the secret.
    key_hash: String,
    /// Caller-visible record.
    record: ApiKey,
}

/// All ledger tables.
#[derive(Debug, Default)]
struct MemoryState {
    /// Users by internal id.
    users: BTreeMap<UserId, User>,
    /// Keys in insertion order.
    keys: Vec<StoredKey>,
    /// Runs in insertion order.
    runs: Vec<OptimizationRun>,
}

impl MemoryState {
    /// Fails unless `user_id` exists.
    fn require_user(&self, user_id: &UserId) -> Result<(), StoreError> {
        if self.users.contains_key(user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {user_id}")))
        }
    }
}

// ============================================================================
// SECTION: Datastore
// ============================================================================

/// In-memory ledger datastore for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDatastore {
    /// Ledger tables protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDatastore {
    /// Creates an empty datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("ledger datastore mutex poisoned".to_string()))
    }
}

impl UserStore for InMemoryDatastore {
    fn find_user_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.users.values().find(|user| &user.external_id == external_id).cloned())
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.users.values().any(|existing| existing.external_id == user.external_id) {
            return Err(StoreError::Conflict(format!(
                "users.external_id already exists: {}",
                user.external_id
            )));
        }
        if guard.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("users.id already exists: {}", user.id)));
        }
        guard.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

impl ApiKeyStore for InMemoryDatastore {
    fn insert_api_key(&self, key: &NewApiKey) -> Result<ApiKey, StoreError> {
        let mut guard = self.lock()?;
        guard.require_user(&key.user_id)?;
        if guard.keys.iter().any(|stored| stored.key_hash == key.key_hash) {
            return Err(StoreError::Conflict("api_keys.key_hash already exists".to_string()));
        }
        if guard.keys.iter().any(|stored| stored.record.id == key.id) {
            return Err(StoreError::Conflict(format!("api_keys.id already exists: {}", key.id)));
        }
        let record = ApiKey::from(key.clone());
        guard.keys.push(StoredKey {
            key_hash: key.key_hash.clone(),
            record: record.clone(),
        });
        Ok(record)
    }

    fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ValidatedKey>, StoreError> {
        let guard = self.lock()?;
        let Some(stored) =
            guard.keys.iter().find(|stored| stored.record.is_active && stored.key_hash == key_hash)
        else {
            return Ok(None);
        };
        let Some(user) = guard.users.get(&stored.record.user_id) else {
            return Err(StoreError::Corrupt(format!(
                "api key {} references missing user",
                stored.record.id
            )));
        };
        Ok(Some(ValidatedKey {
            key: stored.record.clone(),
            user: user.clone(),
        }))
    }

    fn touch_api_key(&self, key_id: &ApiKeyId, at: Timestamp) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if let Some(stored) = guard.keys.iter_mut().find(|stored| &stored.record.id == key_id) {
            stored.record.last_used_at = Some(at);
        }
        Ok(())
    }

    fn revoke_api_key(
        &self,
        user_id: &UserId,
        key_id: &ApiKeyId,
        at: Timestamp,
    ) -> Result<Option<ApiKey>, StoreError> {
        let mut guard = self.lock()?;
        let Some(stored) = guard
            .keys
            .iter_mut()
            .find(|stored| &stored.record.id == key_id && &stored.record.user_id == user_id)
        else {
            return Ok(None);
        };
        stored.record.is_active = false;
        stored.record.revoked_at = stored.record.revoked_at.or(Some(at));
        Ok(Some(stored.record.clone()))
    }

    fn list_api_keys(&self, user_id: &UserId) -> Result<Vec<ApiKey>, StoreError> {
        let guard = self.lock()?;
        let mut owned: Vec<(usize, &ApiKey)> = guard
            .keys
            .iter()
            .map(|stored| &stored.record)
            .enumerate()
            .filter(|(_, record)| &record.user_id == user_id)
            .collect();
        owned.sort_by(|(left_seq, left), (right_seq, right)| {
            right.created_at.cmp(&left.created_at).then_with(|| right_seq.cmp(left_seq))
        });
        Ok(owned.into_iter().map(|(_, record)| record.clone()).collect())
    }
}

impl RunStore for InMemoryDatastore {
    fn upsert_run(
        &self,
        request: &RunUpsert,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut guard = self.lock()?;
        guard.require_user(&request.user_id)?;
        if let Some(run) = guard.runs.iter_mut().find(|run| {
            run.user_id == request.user_id && run.operation_id == request.operation_id
        }) {
            let previous = run.status;
            run.status = request.status;
            run.fields = request.fields.clone();
            return Ok(UpsertOutcome {
                run: run.clone(),
                previous_status: Some(previous),
            });
        }
        let run = OptimizationRun {
            id: RunRecordId::generate(),
            user_id: request.user_id.clone(),
            operation_id: request.operation_id.clone(),
            status: request.status,
            fields: request.fields.clone(),
            created_at: now,
        };
        guard.runs.push(run.clone());
        Ok(UpsertOutcome {
            run,
            previous_status: None,
        })
    }

    fn find_run(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .runs
            .iter()
            .find(|run| &run.user_id == user_id && &run.operation_id == operation_id)
            .cloned())
    }

    fn query_runs(
        &self,
        user_id: &UserId,
        filters: &RunFilters,
        sort: RunSort,
        window: PageWindow,
    ) -> Result<RunPage, StoreError> {
        let guard = self.lock()?;
        let mut matched: Vec<(usize, &OptimizationRun)> = guard
            .runs
            .iter()
            .enumerate()
            .filter(|(_, run)| &run.user_id == user_id && filters.matches(run))
            .collect();
        matched.sort_by(|(left_seq, left), (right_seq, right)| {
            sort.compare(left, right).then_with(|| sort.direction.apply(left_seq.cmp(right_seq)))
        });
        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let runs =
            matched.into_iter().skip(offset).take(limit).map(|(_, run)| run.clone()).collect();
        Ok(RunPage {
            runs,
            total,
        })
    }

    fn run_metrics(&self, user_id: &UserId) -> Result<Vec<RunMetrics>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .runs
            .iter()
            .filter(|run| &run.user_id == user_id)
            .map(RunMetrics::from)
            .collect())
    }
}
