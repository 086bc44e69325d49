//! Process spawning abstraction
//!
//! Launching real OS processes sits behind a trait so the launcher can be
//! tested with an in-process fake. The production implementation uses
//! `tokio::process` with kill-on-drop so orphaned children do not outlive
//! the orchestrator.

use crate::error::{OrchestratorError, OrchestratorResult};
use argos_core::ComponentId;
use async_trait::async_trait;
use std::time::Duration;

/// Handle to a spawned component process
#[async_trait]
pub trait ProcessHandle: Send {
    /// Wait up to `grace_ms` for the process to exit on its own
    ///
    /// Returns true if it exited within the grace period.
    async fn wait_exit_ms(&mut self, grace_ms: u64) -> bool;

    /// Force-terminate the process
    async fn kill(&mut self);
}

/// Spawns component processes from their configured launch commands
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(
        &self,
        id: &ComponentId,
        command: &str,
    ) -> OrchestratorResult<Box<dyn ProcessHandle>>;
}

/// Production spawner backed by `tokio::process`
pub struct TokioSpawner;

#[async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn spawn(
        &self,
        id: &ComponentId,
        command: &str,
    ) -> OrchestratorResult<Box<dyn ProcessHandle>> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| OrchestratorError::spawn_failed(id.as_str(), "empty launch command"))?;

        let child = tokio::process::Command::new(program)
            .args(parts)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OrchestratorError::spawn_failed(id.as_str(), e.to_string()))?;

        tracing::debug!(component = %id, pid = child.id(), "spawned component process");
        Ok(Box::new(TokioProcessHandle { child }))
    }
}

struct TokioProcessHandle {
    child: tokio::process::Child,
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    async fn wait_exit_ms(&mut self, grace_ms: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(grace_ms), self.child.wait())
            .await
            .is_ok()
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "failed to kill component process");
        }
    }
}
