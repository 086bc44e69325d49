//! Wave-ordered component launcher
//!
//! Launches components wave by wave: everything in a wave spawns
//! concurrently, and the next wave does not start until every member of the
//! current wave has reported healthy in the registry or been written off. A
//! component whose dependency failed or was skipped is skipped, not failed;
//! the report distinguishes the two.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::graph::DependencyGraph;
use crate::process::{ProcessHandle, ProcessSpawner};
use argos_core::constants::{HEALTH_POLL_INTERVAL_MS_DEFAULT, SHUTDOWN_GRACE_MS_DEFAULT};
use argos_core::{ComponentId, Epoch, OrchestratorConfig, TimeProvider};
use argos_registry::Registry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of a full startup run, enumerating every configured component
#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Components that reported healthy within their timeout
    pub launched: Vec<ComponentId>,
    /// Components that spawned but never reported healthy, or failed to spawn
    pub failed: Vec<(ComponentId, OrchestratorError)>,
    /// Components never attempted because a dependency failed or was skipped
    pub skipped: Vec<ComponentId>,
}

impl LaunchReport {
    /// Whether every configured component launched successfully
    pub fn all_launched(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Launches the configured component set in dependency order
pub struct Launcher {
    config: OrchestratorConfig,
    graph: DependencyGraph,
    registry: Arc<dyn Registry>,
    spawner: Arc<dyn ProcessSpawner>,
    time: Arc<dyn TimeProvider>,
    poll_interval_ms: u64,
    shutdown_grace_ms: u64,
    processes: Mutex<HashMap<ComponentId, Box<dyn ProcessHandle>>>,
    epochs: Mutex<HashMap<ComponentId, Epoch>>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("config", &self.config)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("shutdown_grace_ms", &self.shutdown_grace_ms)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Build a launcher over a validated configuration
    ///
    /// Fails up front with `CyclicDependency` if the component map has a
    /// cycle; in that case nothing is spawned.
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<dyn Registry>,
        spawner: Arc<dyn ProcessSpawner>,
        time: Arc<dyn TimeProvider>,
    ) -> OrchestratorResult<Self> {
        let graph = DependencyGraph::from_components(&config.components)?;
        Ok(Self {
            config,
            graph,
            registry,
            spawner,
            time,
            poll_interval_ms: HEALTH_POLL_INTERVAL_MS_DEFAULT,
            shutdown_grace_ms: SHUTDOWN_GRACE_MS_DEFAULT,
            processes: Mutex::new(HashMap::new()),
            epochs: Mutex::new(HashMap::new()),
        })
    }

    /// Override the health poll interval (milliseconds)
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Override the shutdown grace period (milliseconds)
    pub fn with_shutdown_grace_ms(mut self, grace_ms: u64) -> Self {
        self.shutdown_grace_ms = grace_ms;
        self
    }

    /// The computed launch waves
    pub fn waves(&self) -> &[Vec<ComponentId>] {
        self.graph.waves()
    }

    /// Launch every component, wave by wave
    ///
    /// Members of one wave launch concurrently; the next wave starts only
    /// once the current one has settled. The report covers every configured
    /// component exactly once.
    pub async fn run(&self) -> LaunchReport {
        let mut report = LaunchReport::default();
        let mut unavailable: HashSet<ComponentId> = HashSet::new();

        for wave in self.graph.waves() {
            let mut launchable = Vec::new();
            for id in wave {
                let blocked = self
                    .graph
                    .dependencies_of(id)
                    .iter()
                    .any(|dep| unavailable.contains(dep));
                if blocked {
                    tracing::warn!(component = %id, "skipping: dependency unavailable");
                    unavailable.insert(id.clone());
                    report.skipped.push(id.clone());
                } else {
                    launchable.push(id.clone());
                }
            }

            let results = futures::future::join_all(
                launchable.iter().map(|id| self.launch_and_await_health(id)),
            )
            .await;

            for (id, result) in launchable.into_iter().zip(results) {
                match result {
                    Ok(()) => {
                        tracing::info!(component = %id, "component launched");
                        report.launched.push(id);
                    }
                    Err(e) => {
                        tracing::error!(component = %id, error = %e, "component failed to launch");
                        unavailable.insert(id.clone());
                        report.failed.push((id, e));
                    }
                }
            }
        }

        report
    }

    /// Spawn one component and poll the registry until it is healthy
    async fn launch_and_await_health(&self, id: &ComponentId) -> OrchestratorResult<()> {
        let spec = self
            .config
            .components
            .get(id.as_str())
            .ok_or_else(|| OrchestratorError::Internal {
                reason: format!("component {} missing from configuration", id),
            })?;

        let handle = self.spawner.spawn(id, &spec.launch_command).await?;
        self.processes.lock().await.insert(id.clone(), handle);

        let deadline_ms = self
            .time
            .now_ms()
            .saturating_add(spec.timeout_seconds.saturating_mul(1000));

        loop {
            if let Ok(Some(record)) = self.registry.get(id).await {
                if record.status.is_available() {
                    self.epochs
                        .lock()
                        .await
                        .insert(id.clone(), record.registration_epoch);
                    return Ok(());
                }
            }

            if self.time.now_ms() >= deadline_ms {
                return Err(OrchestratorError::LaunchFailed {
                    id: id.to_string(),
                    timeout_seconds: spec.timeout_seconds,
                });
            }

            self.time.sleep_ms(self.poll_interval_ms).await;
        }
    }

    /// Stop every launched component
    ///
    /// Best-effort: unregisters each component with its observed epoch, waits
    /// out the grace period for a clean exit, then kills stragglers. Errors
    /// are logged, never propagated; shutdown always completes.
    pub async fn shutdown(&self) {
        let processes: Vec<_> = self.processes.lock().await.drain().collect();
        let epochs = std::mem::take(&mut *self.epochs.lock().await);

        for (id, mut handle) in processes {
            if let Some(epoch) = epochs.get(&id) {
                if let Err(e) = self.registry.unregister(&id, *epoch).await {
                    tracing::warn!(component = %id, error = %e, "unregister during shutdown failed");
                }
            }

            if handle.wait_exit_ms(self.shutdown_grace_ms).await {
                tracing::info!(component = %id, "component exited cleanly");
            } else {
                tracing::warn!(component = %id, "grace period expired, killing component");
                handle.kill().await;
            }
        }
    }
}
