// crates/smtrx-core/src/runtime/audit.rs
// ============================================================================
// Module: Ledger Audit Logging
// Description: Structured audit events for credential and ledger operations.
// Purpose: Emit JSON-line audit records without a logging framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every service reports what it did through a [`LedgerAuditSink`]. Events
//! carry identifiers and key display prefixes only; plaintext secrets and
//! secret digests never appear in an event. Deployments pick a sink (stderr,
//! append-only file, or none) through configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::ApiKeyId;
use crate::core::OperationId;
use crate::core::Timestamp;
use crate::core::UserId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome classification for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation succeeded.
    Ok,
    /// Operation was refused.
    Denied,
    /// Operation failed.
    Error,
}

/// Ledger audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Outcome classification.
    pub outcome: AuditOutcome,
    /// User the event concerns.
    pub user_id: Option<String>,
    /// API key the event concerns.
    pub key_id: Option<String>,
    /// Display prefix of the key the event concerns.
    pub key_prefix: Option<String>,
    /// Run operation the event concerns.
    pub operation_id: Option<String>,
    /// Short free-form detail.
    pub detail: Option<String>,
}

impl LedgerAuditEvent {
    /// Starts an event with no subject fields set.
    #[must_use]
    pub const fn new(event: &'static str, at: Timestamp, outcome: AuditOutcome) -> Self {
        Self {
            event,
            timestamp_ms: at.as_unix_millis(),
            outcome,
            user_id: None,
            key_id: None,
            key_prefix: None,
            operation_id: None,
            detail: None,
        }
    }

    /// Sets the user subject.
    #[must_use]
    pub fn user(mut self, user_id: &UserId) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Sets the key subject.
    #[must_use]
    pub fn key(mut self, key_id: &ApiKeyId, key_prefix: &str) -> Self {
        self.key_id = Some(key_id.to_string());
        self.key_prefix = Some(key_prefix.to_string());
        self
    }

    /// Sets the key identifier without a prefix.
    #[must_use]
    pub fn key_id(mut self, key_id: &ApiKeyId) -> Self {
        self.key_id = Some(key_id.to_string());
        self
    }

    /// Sets the run subject.
    #[must_use]
    pub fn operation(mut self, operation_id: &OperationId) -> Self {
        self.operation_id = Some(operation_id.to_string());
        self
    }

    /// Sets the detail text.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for ledger events.
pub trait LedgerAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &LedgerAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl LedgerAuditSink for StderrAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LedgerAuditSink for FileAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl LedgerAuditSink for NoopAuditSink {
    fn record(&self, _event: &LedgerAuditEvent) {}
}
