// crates/smtrx-core/src/runtime/gateway.rs
// ============================================================================
// Module: Datastore Gateway
// Description: Optional, injected datastore handle shared by all services.
// Purpose: Centralize the "is a datastore configured" decision.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! A deployment without datastore credentials still constructs the services;
//! the gateway simply holds no store. Writes then fail with
//! [`LedgerError::Configuration`] while reads behave as if the store were
//! empty. Services never inspect the option themselves; they ask for
//! [`DatastoreGateway::writable`] or [`DatastoreGateway::readable`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::interfaces::Datastore;
use crate::runtime::error::LedgerError;

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Shared, possibly unconfigured, datastore handle.
#[derive(Clone, Default)]
pub struct DatastoreGateway {
    /// Backing datastore when configured.
    store: Option<Arc<dyn Datastore>>,
}

impl DatastoreGateway {
    /// Wraps a datastore.
    #[must_use]
    pub fn new(store: impl Datastore + 'static) -> Self {
        Self {
            store: Some(Arc::new(store)),
        }
    }

    /// Wraps an already shared datastore.
    #[must_use]
    pub fn from_shared(store: Arc<dyn Datastore>) -> Self {
        Self {
            store: Some(store),
        }
    }

    /// Returns a gateway with no datastore behind it.
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self {
            store: None,
        }
    }

    /// Returns true when a datastore is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the datastore for a write, failing fast when unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Configuration`] when no datastore is configured.
    pub fn writable(&self) -> Result<&dyn Datastore, LedgerError> {
        self.store.as_deref().ok_or(LedgerError::Configuration)
    }

    /// Returns the datastore for a read; `None` means "no data".
    #[must_use]
    pub fn readable(&self) -> Option<&dyn Datastore> {
        self.store.as_deref()
    }
}

impl fmt::Debug for DatastoreGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreGateway").field("configured", &self.is_configured()).finish()
    }
}
