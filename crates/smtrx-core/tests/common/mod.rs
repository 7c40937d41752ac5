// crates/smtrx-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared harness, audit recorder, and datastore wrappers.
// Purpose: Provide deterministic ledger services for integration tests.
// Dependencies: smtrx-core
// ============================================================================

//! ## Overview
//! Tests build services over an in-memory datastore with a pinned clock and a
//! recording audit sink so timestamps and emitted events can be asserted
//! exactly.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use smtrx_core::ApiKey;
use smtrx_core::ApiKeyId;
use smtrx_core::ApiKeyStore;
use smtrx_core::DatastoreGateway;
use smtrx_core::ExternalId;
use smtrx_core::ExternalIdentity;
use smtrx_core::FixedClock;
use smtrx_core::InMemoryDatastore;
use smtrx_core::LedgerAuditEvent;
use smtrx_core::LedgerAuditSink;
use smtrx_core::LedgerContext;
use smtrx_core::LedgerServices;
use smtrx_core::NewApiKey;
use smtrx_core::OperationId;
use smtrx_core::OptimizationRun;
use smtrx_core::PageWindow;
use smtrx_core::QueryLimits;
use smtrx_core::RunFields;
use smtrx_core::RunFilters;
use smtrx_core::RunMetrics;
use smtrx_core::RunPage;
use smtrx_core::RunSort;
use smtrx_core::RunStatus;
use smtrx_core::RunStore;
use smtrx_core::RunUpsert;
use smtrx_core::StoreError;
use smtrx_core::Timestamp;
use smtrx_core::UpsertOutcome;
use smtrx_core::User;
use smtrx_core::UserId;
use smtrx_core::UserStore;
use smtrx_core::ValidatedKey;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Clock start used by every harness.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<LedgerAuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<LedgerAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|event| event.event == name).count()
    }
}

impl LedgerAuditSink for RecordingAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Services plus the handles tests steer them with.
pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub audit: Arc<RecordingAuditSink>,
    pub services: LedgerServices,
}

impl Harness {
    pub fn new() -> Self {
        Self::over(DatastoreGateway::new(InMemoryDatastore::new()))
    }

    pub fn unconfigured() -> Self {
        Self::over(DatastoreGateway::unconfigured())
    }

    pub fn over(gateway: DatastoreGateway) -> Self {
        Self::with_limits(gateway, QueryLimits::default())
    }

    pub fn with_limits(gateway: DatastoreGateway, limits: QueryLimits) -> Self {
        let clock = Arc::new(FixedClock::new(Timestamp::from_unix_millis(START_MILLIS)));
        let audit = Arc::new(RecordingAuditSink::default());
        let context = LedgerContext::new(gateway).with_clock(clock.clone()).with_audit(audit.clone());
        let services = LedgerServices::new(&context, limits);
        Self {
            clock,
            audit,
            services,
        }
    }

    /// Provisions (or resolves) the user for `external_id`.
    pub fn user(&self, external_id: &str) -> User {
        self.services.provisioner.resolve_or_create(identity(external_id)).unwrap()
    }

    /// Upserts a run and advances the clock by one millisecond.
    pub fn record(&self, request: &RunUpsert) -> OptimizationRun {
        let run = self.services.runs.upsert(request).unwrap();
        self.clock.advance(1);
        run
    }
}

pub fn identity(external_id: &str) -> ExternalIdentity {
    ExternalIdentity {
        external_id: ExternalId::new(external_id),
        email: format!("{external_id}@example.com"),
        name: Some(format!("User {external_id}")),
    }
}

pub fn run_request(user: &User, operation_id: &str, status: RunStatus) -> RunUpsert {
    RunUpsert {
        user_id: user.id.clone(),
        operation_id: OperationId::new(operation_id),
        status,
        fields: RunFields::default(),
    }
}

pub fn at(millis_after_start: i64) -> Timestamp {
    Timestamp::from_unix_millis(START_MILLIS + millis_after_start)
}

// ============================================================================
// SECTION: Datastore Wrappers
// ============================================================================

/// In-memory datastore whose `last_used_at` writes always fail.
#[derive(Default, Clone)]
pub struct FailingTouchStore {
    pub inner: InMemoryDatastore,
}

impl UserStore for FailingTouchStore {
    fn find_user_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_external_id(external_id)
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert_user(user)
    }
}

impl ApiKeyStore for FailingTouchStore {
    fn insert_api_key(&self, key: &NewApiKey) -> Result<ApiKey, StoreError> {
        self.inner.insert_api_key(key)
    }

    fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ValidatedKey>, StoreError> {
        self.inner.find_active_api_key(key_hash)
    }

    fn touch_api_key(&self, _key_id: &ApiKeyId, _at: Timestamp) -> Result<(), StoreError> {
        Err(StoreError::Io("touch refused".to_string()))
    }

    fn revoke_api_key(
        &self,
        user_id: &UserId,
        key_id: &ApiKeyId,
        at: Timestamp,
    ) -> Result<Option<ApiKey>, StoreError> {
        self.inner.revoke_api_key(user_id, key_id, at)
    }

    fn list_api_keys(&self, user_id: &UserId) -> Result<Vec<ApiKey>, StoreError> {
        self.inner.list_api_keys(user_id)
    }
}

impl RunStore for FailingTouchStore {
    fn upsert_run(
        &self,
        request: &RunUpsert,
        now: Timestamp,
    ) -> Result<UpsertOutcome, StoreError> {
        self.inner.upsert_run(request, now)
    }

    fn find_run(
        &self,
        user_id: &UserId,
        operation_id: &OperationId,
    ) -> Result<Option<OptimizationRun>, StoreError> {
        self.inner.find_run(user_id, operation_id)
    }

    fn query_runs(
        &self,
        user_id: &UserId,
        filters: &RunFilters,
        sort: RunSort,
        window: PageWindow,
    ) -> Result<RunPage, StoreError> {
        self.inner.query_runs(user_id, filters, sort, window)
    }

    fn run_metrics(&self, user_id: &UserId) -> Result<Vec<RunMetrics>, StoreError> {
        self.inner.run_metrics(user_id)
    }
}
