//! Registry error taxonomy
//!
//! Transient conditions (`Unreachable`) are absorbed by retry in the
//! heartbeat monitor; structural conditions are surfaced immediately.

use argos_core::{ComponentId, Epoch};
use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Bad registration payload; rejected, never retried
    #[error("invalid component: {id}, reason: {reason}")]
    InvalidComponent { id: String, reason: String },

    /// Heartbeat or lookup for an id that was never registered
    #[error("unknown component: {id}")]
    UnknownComponent { id: String },

    /// A newer registration epoch exists; the caller has been superseded
    #[error("stale epoch for {id}: given {given}, registry holds {stored}")]
    StaleEpoch {
        id: String,
        given: Epoch,
        stored: Epoch,
    },

    /// Transient transport failure; the registry may be restarting
    #[error("registry unreachable: {reason}")]
    Unreachable { reason: String },

    /// Internal registry error
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl RegistryError {
    /// Create an invalid component error
    pub fn invalid_component(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComponent {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown component error
    pub fn unknown_component(id: &ComponentId) -> Self {
        Self::UnknownComponent {
            id: id.to_string(),
        }
    }

    /// Create a stale epoch error
    pub fn stale_epoch(id: &ComponentId, given: Epoch, stored: Epoch) -> Self {
        Self::StaleEpoch {
            id: id.to_string(),
            given,
            stored,
        }
    }

    /// Create an unreachable error
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a retriable condition
    ///
    /// Only transport failures are retriable; everything else requires the
    /// caller to change something (payload, epoch, configuration).
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
