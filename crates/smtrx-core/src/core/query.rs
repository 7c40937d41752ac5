// crates/smtrx-core/src/core/query.rs
// ============================================================================
// Module: Run Query Model
// Description: Filters, ordering, pagination, and aggregate statistics.
// Purpose: Give every datastore the same query semantics to implement.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A run listing is a filtered, ordered page plus statistics over the user's
//! whole history. Filter matching and sort comparison are defined here so the
//! in-memory datastore and the SQL datastores agree on edge cases:
//! - `search` is an ASCII case-insensitive substring match on `problem_id`.
//! - Date bounds are inclusive on `created_at`.
//! - Missing sort values order as greater than any present value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::core::run::OptimizationRun;
use crate::core::run::RunStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Filters
// ============================================================================

/// AND-combined run filters; `None` disables a filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFilters {
    /// Exact status match.
    pub status: Option<RunStatus>,
    /// Exact strategy match.
    pub strategy: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub start_date: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    pub end_date: Option<Timestamp>,
    /// Case-insensitive substring of `problem_id`, folded with full Unicode
    /// lowercasing.
    pub search: Option<String>,
}

impl RunFilters {
    /// Drops empty strategy and search values so they do not filter.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.strategy = self.strategy.filter(|value| !value.is_empty());
        self.search = self.search.filter(|value| !value.trim().is_empty());
        self
    }

    /// Returns true when `run` passes every active filter.
    #[must_use]
    pub fn matches(&self, run: &OptimizationRun) -> bool {
        if let Some(status) = self.status
            && run.status != status
        {
            return false;
        }
        if let Some(strategy) = &self.strategy
            && run.fields.strategy_used.as_deref() != Some(strategy.as_str())
        {
            return false;
        }
        if let Some(start) = self.start_date
            && run.created_at < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && run.created_at > end
        {
            return false;
        }
        if let Some(needle) = &self.search {
            let Some(problem_id) = &run.fields.problem_id else {
                return false;
            };
            if !fold_case(problem_id).contains(&fold_case(needle)) {
                return false;
            }
        }
        true
    }
}

/// Lowercases text for search matching.
///
/// SQL datastores must apply the same folding to both operands.
#[must_use]
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Sortable run columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Creation time.
    #[default]
    CreatedAt,
    /// Objective value.
    OptimalValue,
    /// Evaluation count.
    EvaluationsUsed,
}

impl SortField {
    /// Returns the column name used by SQL datastores.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::OptimalValue => "optimal_value",
            Self::EvaluationsUsed => "evaluations_used",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// Applies the direction to an ascending ordering.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Listing order; the default is newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSort {
    /// Column to order by.
    pub field: SortField,
    /// Direction to order in.
    pub direction: SortDirection,
}

impl RunSort {
    /// Compares two runs on the sort column in the sort direction.
    ///
    /// Ties are left to the datastore, which breaks them by insertion order.
    #[must_use]
    pub fn compare(&self, left: &OptimizationRun, right: &OptimizationRun) -> Ordering {
        let ascending = match self.field {
            SortField::CreatedAt => left.created_at.cmp(&right.created_at),
            SortField::OptimalValue => compare_missing_last(
                left.fields.optimal_value,
                right.fields.optimal_value,
                // Values are finite; `-0.0` and `0.0` compare equal as in SQL.
                |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal),
            ),
            SortField::EvaluationsUsed => compare_missing_last(
                left.fields.evaluations_used,
                right.fields.evaluations_used,
                |a, b| a.cmp(b),
            ),
        };
        self.direction.apply(ascending)
    }
}

/// Orders present values before missing ones.
fn compare_missing_last<T>(
    left: Option<T>,
    right: Option<T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// One-indexed page request.
///
/// # Invariants
/// - `page >= 1` and `limit >= 1`; the query engine validates both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// One-indexed page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

impl PageWindow {
    /// Returns the zero-based index of the first row on the page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns the inclusive row range `[(page-1)*limit, page*limit-1]`.
    #[must_use]
    pub fn range(self) -> (u64, u64) {
        let start = self.offset();
        (start, (start + u64::from(self.limit)).saturating_sub(1))
    }
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// One-indexed page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Rows matching the filters across all pages.
    pub total: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
}

impl Pagination {
    /// Builds metadata for a window over `total` matching rows.
    #[must_use]
    pub fn new(window: PageWindow, total: u64) -> Self {
        Self {
            page: window.page,
            limit: window.limit,
            total,
            total_pages: total_pages(total, window.limit),
        }
    }
}

/// Returns `ceil(total / limit)`, or 0 when `limit` is 0.
#[must_use]
pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

/// Filtered page as produced by a datastore.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunPage {
    /// Rows on the requested page.
    pub runs: Vec<OptimizationRun>,
    /// Rows matching the filters across all pages.
    pub total: u64,
}

// ============================================================================
// SECTION: Aggregate Statistics
// ============================================================================

/// Columns read by the unfiltered statistics scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    /// Lifecycle status.
    pub status: RunStatus,
    /// Engine success flag.
    pub success: Option<bool>,
    /// Recorded execution time.
    pub execution_time: Option<f64>,
    /// Recorded evaluation count.
    pub evaluations_used: Option<i64>,
}

impl From<&OptimizationRun> for RunMetrics {
    fn from(run: &OptimizationRun) -> Self {
        Self {
            status: run.status,
            success: run.fields.success,
            execution_time: run.fields.execution_time,
            evaluations_used: run.fields.evaluations_used,
        }
    }
}

/// Statistics over a user's entire run history, independent of filters.
///
/// # Invariants
/// - `successful + failed + running <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// All runs.
    pub total: u64,
    /// Runs with status `completed` and `success = true`.
    pub successful: u64,
    /// Runs with status `failed`.
    pub failed: u64,
    /// Runs with status `running`.
    pub running: u64,
    /// Mean execution time over runs that recorded one.
    pub avg_execution_time: Option<f64>,
    /// Mean evaluation count over runs that recorded one.
    pub avg_evaluations_used: Option<f64>,
}

impl RunStats {
    /// Aggregates statistics from a full-history scan.
    #[must_use]
    pub fn from_metrics(metrics: &[RunMetrics]) -> Self {
        let mut stats = Self::default();
        let mut execution = Mean::default();
        let mut evaluations = Mean::default();
        for row in metrics {
            stats.total += 1;
            match row.status {
                RunStatus::Completed if row.success == Some(true) => stats.successful += 1,
                RunStatus::Failed => stats.failed += 1,
                RunStatus::Running => stats.running += 1,
                RunStatus::Completed | RunStatus::Cancelled => {}
            }
            if let Some(value) = row.execution_time {
                execution.push(value);
            }
            if let Some(value) = row.evaluations_used {
                #[allow(clippy::cast_precision_loss, reason = "Averages are reported as floats.")]
                evaluations.push(value as f64);
            }
        }
        stats.avg_execution_time = execution.value();
        stats.avg_evaluations_used = evaluations.value();
        stats
    }
}

/// Running arithmetic mean.
#[derive(Debug, Default)]
struct Mean {
    /// Sum of observed values.
    sum: f64,
    /// Number of observed values.
    count: u64,
}

impl Mean {
    /// Adds one observation.
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
    }

    /// Returns the mean, or `None` without observations.
    fn value(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss, reason = "Averages are reported as floats.")]
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Complete answer to a run listing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListing {
    /// Rows on the requested page.
    pub runs: Vec<OptimizationRun>,
    /// Pagination metadata.
    pub pagination: Pagination,
    /// Full-history statistics.
    pub stats: RunStats,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
