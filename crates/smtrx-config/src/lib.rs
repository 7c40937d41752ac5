// crates/smtrx-config/src/lib.rs
// ============================================================================
// Module: SMTRX Config Library
// Description: Canonical config model, validation, and service wiring.
// Purpose: Single source of truth for smtrx.toml semantics.
// Dependencies: smtrx-core, smtrx-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `smtrx-config` defines the configuration model for the ledger services.
//! Validation is strict and fail-closed; [`build_services`] turns a validated
//! config into ready [`smtrx_core::LedgerServices`].
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use wiring::WiringError;
pub use wiring::build_audit_sink;
pub use wiring::build_gateway;
pub use wiring::build_services;
