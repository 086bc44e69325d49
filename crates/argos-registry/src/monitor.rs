//! Heartbeat monitor
//!
//! Owned by each component process; keeps that component's registration
//! alive and recovers from registry outages. The core recovery mechanism: a
//! registry restart loses all in-memory records, so every live component's
//! monitor independently re-registers and the system reaches consistency
//! again without a central recovery coordinator.
//!
//! State machine:
//!
//! ```text
//! Unregistered -> Registering -> Active -> Disconnected -> Registering -> Active ...
//!                                   |
//!                                   +-> Failed (superseded epoch, fatal)
//! ```

use crate::error::RegistryError;
use crate::service::{Registration, Registry};
use argos_core::{ComponentId, Epoch, TimeProvider};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fatal monitor conditions surfaced to the owning component
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The registry holds a newer epoch for this id. Usually a duplicate-id
    /// configuration error; never silently retried.
    #[error("registration for {id} superseded: our epoch {given}, registry holds {stored}")]
    Superseded {
        id: String,
        given: Epoch,
        stored: Epoch,
    },

    /// The registry rejected the registration payload outright
    #[error("registration for {id} rejected: {reason}")]
    Rejected { id: String, reason: String },

    #[error("monitor internal error: {reason}")]
    Internal { reason: String },
}

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Not yet registered
    Unregistered,
    /// Attempting (re-)registration
    Registering,
    /// Registered; heartbeating on the interval
    Active,
    /// Registry unreachable; probing at the same interval, no retry storm
    Disconnected,
    /// Superseded or rejected; the monitor has stopped
    Failed,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Registering => write!(f, "registering"),
            Self::Active => write!(f, "active"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Client-side heartbeat loop for one component
pub struct HeartbeatMonitor {
    id: ComponentId,
    registration: Registration,
    registry: Arc<dyn Registry>,
    time: Arc<dyn TimeProvider>,
    interval_ms: u64,
    state: MonitorState,
    epoch: Option<Epoch>,
}

impl HeartbeatMonitor {
    /// Create a monitor; does not register yet
    pub fn new(
        registration: Registration,
        registry: Arc<dyn Registry>,
        time: Arc<dyn TimeProvider>,
        interval_ms: u64,
    ) -> Result<Self, MonitorError> {
        let id = ComponentId::new(registration.id.clone()).map_err(|e| MonitorError::Rejected {
            id: registration.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            id,
            registration,
            registry,
            time,
            interval_ms,
            state: MonitorState::Unregistered,
            epoch: None,
        })
    }

    /// Current state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Epoch of the current registration, if any
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    /// The component id this monitor keeps alive
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Run one tick of the state machine
    ///
    /// Fatal conditions are returned as errors and leave the monitor in
    /// `Failed`; transient conditions transition to `Disconnected` and
    /// return Ok so the caller keeps probing on the same interval.
    pub async fn step(&mut self) -> Result<(), MonitorError> {
        match self.state {
            MonitorState::Unregistered
            | MonitorState::Registering
            | MonitorState::Disconnected => self.try_register().await,
            MonitorState::Active => self.try_heartbeat().await,
            MonitorState::Failed => Err(MonitorError::Internal {
                reason: "step called on a failed monitor".into(),
            }),
        }
    }

    async fn try_register(&mut self) -> Result<(), MonitorError> {
        self.state = MonitorState::Registering;

        match self.registry.register(self.registration.clone()).await {
            Ok(epoch) => {
                tracing::info!(component = %self.id, epoch = epoch.value(), "registered");
                self.epoch = Some(epoch);
                self.state = MonitorState::Active;
                // Heartbeat immediately so the component becomes a valid
                // dependency target without waiting a full interval.
                Box::pin(self.try_heartbeat()).await
            }
            Err(e) if e.is_retriable() => {
                tracing::warn!(component = %self.id, error = %e, "registry unreachable, will probe again");
                self.state = MonitorState::Disconnected;
                Ok(())
            }
            Err(RegistryError::InvalidComponent { id, reason }) => {
                self.state = MonitorState::Failed;
                Err(MonitorError::Rejected { id, reason })
            }
            Err(e) => {
                tracing::warn!(component = %self.id, error = %e, "registration failed, will retry");
                self.state = MonitorState::Disconnected;
                Ok(())
            }
        }
    }

    async fn try_heartbeat(&mut self) -> Result<(), MonitorError> {
        let epoch = self.epoch.ok_or_else(|| MonitorError::Internal {
            reason: "heartbeat without a registration epoch".into(),
        })?;

        match self.registry.heartbeat(&self.id, epoch).await {
            Ok(_status) => Ok(()),
            Err(e) if e.is_retriable() => {
                // The registry may have restarted and lost the epoch
                // entirely, so probe with a full register, not heartbeats.
                tracing::warn!(component = %self.id, error = %e, "heartbeat failed, disconnected");
                self.state = MonitorState::Disconnected;
                Ok(())
            }
            Err(RegistryError::UnknownComponent { .. }) => {
                // Registry is reachable but lost our record: re-register now.
                tracing::info!(component = %self.id, "registry lost our record, re-registering");
                self.try_register().await
            }
            Err(RegistryError::StaleEpoch { id, given, stored }) => {
                self.state = MonitorState::Failed;
                Err(MonitorError::Superseded { id, given, stored })
            }
            Err(e) => {
                tracing::warn!(component = %self.id, error = %e, "heartbeat failed, disconnected");
                self.state = MonitorState::Disconnected;
                Ok(())
            }
        }
    }

    /// Run the periodic loop until a fatal error or shutdown
    ///
    /// On shutdown, issues a best-effort unregister; the registry's sweep is
    /// the fallback cleanup, not the primary one.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), MonitorError> {
        loop {
            self.step().await?;

            let sleep = self.time.sleep_ms(self.interval_ms);
            tokio::select! {
                _ = sleep => {}
                changed = shutdown.changed() => {
                    // A dropped sender also means shutdown; anything else
                    // would spin on the closed channel.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(epoch) = self.epoch {
            if let Err(e) = self.registry.unregister(&self.id, epoch).await {
                tracing::warn!(component = %self.id, error = %e, "best-effort unregister failed");
            }
        }

        Ok(())
    }

    /// Register and start the periodic loop on a new task
    pub fn start(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = self.id.clone();
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle {
            id,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running monitor
///
/// Dropping the handle signals shutdown; call `stop` on every exit path of
/// the owning component to wait for the best-effort unregister.
pub struct MonitorHandle {
    id: ComponentId,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), MonitorError>>,
}

impl MonitorHandle {
    /// The component id this handle monitors
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Whether the monitor task has terminated (fatal error or shutdown)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for the best-effort unregister
    pub async fn stop(mut self) -> Result<(), MonitorError> {
        let _ = self.shutdown.send(true);
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => Err(MonitorError::Internal {
                reason: format!("monitor task panicked: {}", e),
            }),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
