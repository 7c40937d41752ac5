// crates/smtrx-core/src/runtime/query.rs
// ============================================================================
// Module: Run Query Engine
// Description: Filtered, sorted, paginated run listings with statistics.
// Purpose: Answer dashboard listing requests for one user's run history.
// Dependencies: crate::core, crate::runtime, serde
// ============================================================================

//! ## Overview
//! A listing combines one page of filtered runs with statistics over the
//! user's entire history; filters never affect the statistics. Page and
//! limit default from [`QueryLimits`] and are validated before the datastore
//! is consulted. Without a datastore a listing is empty rather than an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::PageWindow;
use crate::core::Pagination;
use crate::core::RunFilters;
use crate::core::RunListing;
use crate::core::RunSort;
use crate::core::RunStats;
use crate::core::UserId;
use crate::runtime::error::LedgerError;
use crate::runtime::services::LedgerContext;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default rows per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Default maximum rows per page.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 100;

/// Page size limits applied to every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Rows per page when the request omits a limit.
    pub default_limit: u32,
    /// Largest accepted limit.
    pub max_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunQuery {
    /// Row filters.
    pub filters: RunFilters,
    /// Row order.
    pub sort: RunSort,
    /// One-indexed page; defaults to 1.
    pub page: Option<u32>,
    /// Rows per page; defaults to [`QueryLimits::default_limit`].
    pub limit: Option<u32>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Run listing service.
#[derive(Debug, Clone)]
pub struct RunQueryEngine {
    /// Shared service dependencies.
    ctx: LedgerContext,
    /// Page size limits.
    limits: QueryLimits,
}

impl RunQueryEngine {
    /// Builds the engine over `ctx`.
    #[must_use]
    pub const fn new(ctx: LedgerContext, limits: QueryLimits) -> Self {
        Self {
            ctx,
            limits,
        }
    }

    /// Returns the page size limits in force.
    #[must_use]
    pub const fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Lists one page of `user_id`'s runs with full-history statistics.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Invalid`] for a zero page, a zero or oversized
    /// limit, or an inverted date range, and datastore failures otherwise.
    pub fn list(&self, user_id: &UserId, query: RunQuery) -> Result<RunListing, LedgerError> {
        let window = self.window(query.page, query.limit)?;
        let filters = query.filters.normalized();
        if let (Some(start), Some(end)) = (filters.start_date, filters.end_date)
            && start > end
        {
            return Err(LedgerError::Invalid("start_date is after end_date".to_string()));
        }
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(RunListing {
                runs: Vec::new(),
                pagination: Pagination::new(window, 0),
                stats: RunStats::default(),
            });
        };
        let page = store.query_runs(user_id, &filters, query.sort, window)?;
        let metrics = store.run_metrics(user_id)?;
        Ok(RunListing {
            runs: page.runs,
            pagination: Pagination::new(window, page.total),
            stats: RunStats::from_metrics(&metrics),
        })
    }

    /// Computes full-history statistics for `user_id` without a page.
    ///
    /// # Errors
    ///
    /// Returns datastore failures. An unconfigured ledger yields zeroed stats.
    pub fn stats(&self, user_id: &UserId) -> Result<RunStats, LedgerError> {
        let Some(store) = self.ctx.gateway.readable() else {
            return Ok(RunStats::default());
        };
        Ok(RunStats::from_metrics(&store.run_metrics(user_id)?))
    }

    /// Resolves and validates the requested page window.
    fn window(&self, page: Option<u32>, limit: Option<u32>) -> Result<PageWindow, LedgerError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(self.limits.default_limit);
        if page == 0 {
            return Err(LedgerError::Invalid("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > self.limits.max_limit {
            return Err(LedgerError::Invalid(format!(
                "limit must be between 1 and {}",
                self.limits.max_limit
            )));
        }
        Ok(PageWindow {
            page,
            limit,
        })
    }
}
