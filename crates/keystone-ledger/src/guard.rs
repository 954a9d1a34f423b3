//! Per-entity reentrancy guard.
//!
//! Held for the duration of every ledger mutation. A second `enter` while the
//! guard is held fails with [`KeystoneError::Reentrancy`] instead of
//! interleaving two mutations of the same explicit balances.

use keystone_types::{KeystoneError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReentrancyGuard {
    held_by: Option<String>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held_by.is_some()
    }

    /// Operation currently holding the guard.
    #[must_use]
    pub fn held_by(&self) -> Option<&str> {
        self.held_by.as_deref()
    }

    pub fn enter(&mut self, operation: &str) -> Result<()> {
        if let Some(held_by) = &self.held_by {
            return Err(KeystoneError::Reentrancy {
                operation: operation.to_string(),
                held_by: held_by.clone(),
            });
        }
        self.held_by = Some(operation.to_string());
        Ok(())
    }

    pub fn exit(&mut self) {
        self.held_by = None;
    }
}
