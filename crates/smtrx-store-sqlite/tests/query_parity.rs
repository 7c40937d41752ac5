// crates/smtrx-store-sqlite/tests/query_parity.rs
// ============================================================================
// Module: Query Parity Property-Based Tests
// Description: SQLite listings compared against the in-memory datastore.
// Purpose: Ensure both datastores agree on filtering, ordering, and stats.
// Dependencies: smtrx-store-sqlite, smtrx-core, proptest, tempfile
// ============================================================================

//! ## Overview
//! Writes the same randomized history into both datastores and asserts that
//! every listing is identical apart from generated row identifiers.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use proptest::prelude::*;
use smtrx_core::DatastoreGateway;
use smtrx_core::ExternalId;
use smtrx_core::ExternalIdentity;
use smtrx_core::FixedClock;
use smtrx_core::InMemoryDatastore;
use smtrx_core::LedgerContext;
use smtrx_core::LedgerServices;
use smtrx_core::OperationId;
use smtrx_core::QueryLimits;
use smtrx_core::RunFields;
use smtrx_core::RunFilters;
use smtrx_core::RunListing;
use smtrx_core::RunQuery;
use smtrx_core::RunSort;
use smtrx_core::RunStatus;
use smtrx_core::RunUpsert;
use smtrx_core::SortDirection;
use smtrx_core::SortField;
use smtrx_core::Timestamp;
use smtrx_store_sqlite::SqliteDatastore;
use smtrx_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

/// One generated run.
type Row = (u8, Option<String>, Option<f64>, Option<i64>, Option<bool>, u8);

fn services(gateway: DatastoreGateway) -> (LedgerServices, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Timestamp::from_unix_millis(10_000)));
    let context = LedgerContext::new(gateway).with_clock(clock.clone());
    (LedgerServices::new(&context, QueryLimits::default()), clock)
}

fn status(code: u8) -> RunStatus {
    match code % 4 {
        0 => RunStatus::Running,
        1 => RunStatus::Completed,
        2 => RunStatus::Failed,
        _ => RunStatus::Cancelled,
    }
}

fn populate(services: &LedgerServices, clock: &FixedClock, rows: &[Row]) -> smtrx_core::User {
    let user = services
        .provisioner
        .resolve_or_create(ExternalIdentity {
            external_id: ExternalId::new("ext-parity"),
            email: "parity@example.com".to_string(),
            name: None,
        })
        .unwrap();
    for (index, (code, problem, value, evaluations, success, gap)) in rows.iter().enumerate() {
        clock.advance(i64::from(*gap % 3));
        let request = RunUpsert {
            user_id: user.id.clone(),
            operation_id: OperationId::new(format!("op-{index}")),
            status: status(*code),
            fields: RunFields {
                problem_id: problem.clone(),
                optimal_value: *value,
                evaluations_used: *evaluations,
                execution_time: evaluations.map(|count| f64::from(u32::try_from(count).unwrap_or(0))),
                success: *success,
                strategy_used: Some(if code % 2 == 0 { "grid" } else { "bayes" }.to_string()),
                ..RunFields::default()
            },
        };
        services.runs.upsert(&request).unwrap();
    }
    user
}

/// Listing view with generated identifiers stripped.
type Comparable = (Vec<String>, u64, u64, [u64; 4]);

fn comparable(listing: &RunListing) -> Comparable {
    let stats = &listing.stats;
    (
        listing.runs.iter().map(|run| run.operation_id.to_string()).collect(),
        listing.pagination.total,
        listing.pagination.total_pages,
        [stats.total, stats.successful, stats.failed, stats.running],
    )
}

fn value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(-0.0), (-50i32 .. 50).prop_map(f64::from)]
}

fn query_strategy() -> impl Strategy<Value = RunQuery> {
    (
        prop::option::of(0u8 .. 4),
        prop::option::of(prop_oneof![Just("grid".to_string()), Just("bayes".to_string())]),
        prop::option::of("[a-cA-CéÉσΣ%_]{1,2}"),
        prop_oneof![
            Just(SortField::CreatedAt),
            Just(SortField::OptimalValue),
            Just(SortField::EvaluationsUsed),
        ],
        any::<bool>(),
        1u32 .. 4,
        1u32 .. 8,
    )
        .prop_map(|(status_code, strategy, search, field, ascending, page, limit)| RunQuery {
            filters: RunFilters {
                status: status_code.map(status),
                strategy,
                search,
                ..RunFilters::default()
            },
            sort: RunSort {
                field,
                direction: if ascending { SortDirection::Asc } else { SortDirection::Desc },
            },
            page: Some(page),
            limit: Some(limit),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sqlite_and_memory_listings_agree(
        rows in prop::collection::vec(
            (
                any::<u8>(),
                prop::option::of("[a-cA-CéÉσΣ%_]{0,6}"),
                prop::option::of(value_strategy()),
                prop::option::of(0i64 .. 20),
                prop::option::of(any::<bool>()),
                any::<u8>(),
            ),
            0 .. 25,
        ),
        queries in prop::collection::vec(query_strategy(), 1 .. 6),
    ) {
        let temp = TempDir::new().unwrap();
        let sqlite = SqliteDatastore::new(&SqliteStoreConfig::new(temp.path().join("parity.sqlite"))).unwrap();
        let (sql_services, sql_clock) = services(DatastoreGateway::new(sqlite));
        let (mem_services, mem_clock) = services(DatastoreGateway::new(InMemoryDatastore::new()));
        let sql_user = populate(&sql_services, &sql_clock, &rows);
        let mem_user = populate(&mem_services, &mem_clock, &rows);

        for query in queries {
            let from_sql = sql_services.queries.list(&sql_user.id, query.clone()).unwrap();
            let from_mem = mem_services.queries.list(&mem_user.id, query).unwrap();
            prop_assert_eq!(comparable(&from_sql), comparable(&from_mem));
            prop_assert_eq!(from_sql.stats.avg_evaluations_used, from_mem.stats.avg_evaluations_used);
        }
    }
}
