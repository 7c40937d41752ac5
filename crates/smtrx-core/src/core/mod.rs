// crates/smtrx-core/src/core/mod.rs
// ============================================================================
// Module: Ledger Core Types
// Description: Canonical user, credential, and run-ledger records.
// Purpose: Provide stable, serializable types shared by every datastore.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types describe what the ledger stores and how it is queried. They are
//! the source of truth for the datastore interfaces and for any HTTP surface
//! built on top of this crate.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod api_key;
pub mod hashing;
pub mod identifiers;
pub mod query;
pub mod run;
pub mod time;
pub mod user;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api_key::API_KEY_LEN;
pub use api_key::API_KEY_PREFIX;
pub use api_key::ApiKey;
pub use api_key::ApiKeySecret;
pub use api_key::DISPLAY_PREFIX_LEN;
pub use api_key::MAX_KEY_NAME_LENGTH;
pub use api_key::NewApiKey;
pub use api_key::ValidatedKey;
pub use api_key::display_prefix;
pub use api_key::hash_api_key;
pub use api_key::is_well_formed_secret;
pub use identifiers::ApiKeyId;
pub use identifiers::ExternalId;
pub use identifiers::OperationId;
pub use identifiers::RunRecordId;
pub use identifiers::UserId;
pub use query::PageWindow;
pub use query::Pagination;
pub use query::RunFilters;
pub use query::RunListing;
pub use query::RunMetrics;
pub use query::RunPage;
pub use query::RunSort;
pub use query::RunStats;
pub use query::SortDirection;
pub use query::SortField;
pub use query::fold_case;
pub use query::total_pages;
pub use run::OptimizationRun;
pub use run::RunFields;
pub use run::RunStatus;
pub use run::RunUpsert;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;
pub use user::ExternalIdentity;
pub use user::SubscriptionTier;
pub use user::User;
