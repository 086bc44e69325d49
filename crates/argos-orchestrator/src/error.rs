//! Orchestrator error types

use thiserror::Error;

/// Orchestrator-specific errors
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The configured dependency graph contains a cycle; nothing launches
    #[error("dependency cycle involving component {component}")]
    CyclicDependency { component: String },

    /// A dependency references a component missing from the configuration
    #[error("component {component} depends on unknown component {dependency}")]
    UnknownDependency {
        component: String,
        dependency: String,
    },

    /// The component process could not be spawned
    #[error("failed to spawn {id}: {reason}")]
    SpawnFailed { id: String, reason: String },

    /// The component did not report healthy within its timeout
    #[error("component {id} failed to report healthy within {timeout_seconds}s")]
    LaunchFailed { id: String, timeout_seconds: u64 },

    #[error("internal orchestrator error: {reason}")]
    Internal { reason: String },
}

impl OrchestratorError {
    /// Create a spawn failure error
    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
