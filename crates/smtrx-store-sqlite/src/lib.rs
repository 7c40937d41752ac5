// crates/smtrx-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Datastore
// Description: Durable ledger datastore backed by SQLite.
// Purpose: Provide production persistence for users, API keys, and runs.
// Dependencies: smtrx-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed implementation of the ledger datastore
//! traits. Uniqueness and ownership are enforced by indexes and foreign keys
//! so concurrent writers cannot create duplicates. Security posture: storage
//! contents are untrusted and undecodable rows fail closed as corruption.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod rows;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SCHEMA_VERSION;
pub use store::SqliteDatastore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
