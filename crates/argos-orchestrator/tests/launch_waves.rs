//! Orchestrator launch integration tests
//!
//! Uses an in-process fake spawner whose "processes" register and heartbeat
//! against a local registry immediately, or stay silent to simulate a
//! component that never comes up. Time is a mock clock, so the launch
//! timeout path runs without real waiting.

use argos_core::{
    ComponentId, ComponentSpec, ComponentStatus, MockClock, OrchestratorConfig, RegistryConfig,
};
use argos_orchestrator::{
    Launcher, OrchestratorError, OrchestratorResult, ProcessHandle, ProcessSpawner,
};
use argos_registry::{LocalRegistry, QueryFilter, Registration, Registry};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// One spawn call: which component, and which components were already
/// healthy in the registry at that moment.
#[derive(Debug, Clone)]
struct SpawnEvent {
    id: String,
    healthy_at_spawn: Vec<String>,
}

struct FakeSpawner {
    registry: Arc<LocalRegistry>,
    /// Components that spawn but never register
    silent: HashSet<String>,
    /// Components whose process ignores the shutdown grace period
    hang_on_shutdown: HashSet<String>,
    events: Mutex<Vec<SpawnEvent>>,
    killed: Arc<Mutex<Vec<String>>>,
}

impl FakeSpawner {
    fn new(registry: Arc<LocalRegistry>) -> Self {
        Self {
            registry,
            silent: HashSet::new(),
            hang_on_shutdown: HashSet::new(),
            events: Mutex::new(Vec::new()),
            killed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn events(&self) -> Vec<SpawnEvent> {
        self.events.lock().unwrap().clone()
    }

    fn spawn_order(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.id).collect()
    }
}

#[async_trait]
impl ProcessSpawner for FakeSpawner {
    async fn spawn(
        &self,
        id: &ComponentId,
        _command: &str,
    ) -> OrchestratorResult<Box<dyn ProcessHandle>> {
        let healthy = self
            .registry
            .query(&QueryFilter::by_status(ComponentStatus::Healthy))
            .await
            .map_err(|e| OrchestratorError::Internal {
                reason: e.to_string(),
            })?
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();

        self.events.lock().unwrap().push(SpawnEvent {
            id: id.to_string(),
            healthy_at_spawn: healthy,
        });

        if !self.silent.contains(id.as_str()) {
            let epoch = self
                .registry
                .register(Registration {
                    id: id.to_string(),
                    name: id.to_string(),
                    version: "1.0.0".into(),
                    endpoint: "127.0.0.1:7001".into(),
                    capabilities: vec![],
                })
                .await
                .map_err(|e| OrchestratorError::Internal {
                    reason: e.to_string(),
                })?;
            self.registry
                .heartbeat(id, epoch)
                .await
                .map_err(|e| OrchestratorError::Internal {
                    reason: e.to_string(),
                })?;
        }

        Ok(Box::new(FakeHandle {
            id: id.to_string(),
            exits_in_grace: !self.hang_on_shutdown.contains(id.as_str()),
            killed: self.killed.clone(),
        }))
    }
}

struct FakeHandle {
    id: String,
    exits_in_grace: bool,
    killed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    async fn wait_exit_ms(&mut self, _grace_ms: u64) -> bool {
        self.exits_in_grace
    }

    async fn kill(&mut self) {
        self.killed.lock().unwrap().push(self.id.clone());
    }
}

fn spec(command: &str, deps: &[&str], timeout_seconds: u64) -> ComponentSpec {
    ComponentSpec {
        launch_command: command.into(),
        dependencies: deps.iter().map(|s| s.to_string()).collect(),
        timeout_seconds,
    }
}

fn agent_stack_config() -> OrchestratorConfig {
    let mut components = BTreeMap::new();
    components.insert("hermes".to_string(), spec("hermes --port 7001", &[], 1));
    components.insert("engram".to_string(), spec("engram --port 7002", &[], 1));
    components.insert(
        "athena".to_string(),
        spec("athena --port 7003", &["hermes"], 1),
    );
    components.insert(
        "prometheus".to_string(),
        spec("prometheus --port 7004", &["athena"], 1),
    );

    OrchestratorConfig {
        registry: RegistryConfig {
            heartbeat_interval_ms: 100,
            stale_after_ms: 300,
            gone_after_ms: 1000,
            sweep_interval_ms: 100,
        },
        components,
    }
}

fn setup(config: &OrchestratorConfig) -> (Arc<LocalRegistry>, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(1000));
    let registry = Arc::new(LocalRegistry::with_time(
        config.registry.clone(),
        clock.clone(),
    ));
    (registry, clock)
}

fn id(name: &str) -> ComponentId {
    ComponentId::new(name).unwrap()
}

#[tokio::test]
async fn test_launch_waves_respect_dependencies() {
    let config = agent_stack_config();
    let (registry, clock) = setup(&config);
    let spawner = Arc::new(FakeSpawner::new(registry.clone()));

    let launcher = Launcher::new(config, registry.clone(), spawner.clone(), clock)
        .unwrap()
        .with_poll_interval_ms(100);

    assert_eq!(
        launcher.waves(),
        &[
            vec![id("engram"), id("hermes")],
            vec![id("athena")],
            vec![id("prometheus")],
        ]
    );

    let report = launcher.run().await;
    assert!(report.all_launched());
    assert_eq!(report.launched.len(), 4);

    // Dependents spawn strictly after their dependency's first heartbeat
    let events = spawner.events();
    let athena = events.iter().find(|e| e.id == "athena").unwrap();
    assert!(athena.healthy_at_spawn.contains(&"hermes".to_string()));
    let prometheus = events.iter().find(|e| e.id == "prometheus").unwrap();
    assert!(prometheus.healthy_at_spawn.contains(&"athena".to_string()));

    let order = spawner.spawn_order();
    let position = |name: &str| order.iter().position(|e| e == name).unwrap();
    assert!(position("athena") > position("hermes"));
    assert!(position("prometheus") > position("athena"));
}

#[tokio::test]
async fn test_failed_dependency_skips_dependents() {
    let config = agent_stack_config();
    let (registry, clock) = setup(&config);

    let mut spawner = FakeSpawner::new(registry.clone());
    spawner.silent.insert("athena".to_string());
    let spawner = Arc::new(spawner);

    let launcher = Launcher::new(config, registry, spawner.clone(), clock)
        .unwrap()
        .with_poll_interval_ms(100);

    let report = launcher.run().await;

    assert_eq!(report.launched, vec![id("engram"), id("hermes")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, id("athena"));
    assert!(matches!(
        report.failed[0].1,
        OrchestratorError::LaunchFailed { .. }
    ));
    // Prometheus is skipped, not failed: it was never attempted
    assert_eq!(report.skipped, vec![id("prometheus")]);
    assert!(!spawner.spawn_order().contains(&"prometheus".to_string()));
}

#[tokio::test]
async fn test_cycle_launches_nothing() {
    let mut components = BTreeMap::new();
    components.insert("a".to_string(), spec("a", &["b"], 1));
    components.insert("b".to_string(), spec("b", &["c"], 1));
    components.insert("c".to_string(), spec("c", &["a"], 1));
    let config = OrchestratorConfig {
        registry: RegistryConfig::default(),
        components,
    };

    let (registry, clock) = setup(&config);
    let spawner = Arc::new(FakeSpawner::new(registry.clone()));

    let err = Launcher::new(config, registry, spawner.clone(), clock).unwrap_err();
    assert!(matches!(err, OrchestratorError::CyclicDependency { .. }));
    assert!(spawner.spawn_order().is_empty());
}

#[tokio::test]
async fn test_shutdown_unregisters_and_kills_stragglers() {
    let config = agent_stack_config();
    let (registry, clock) = setup(&config);

    let mut spawner = FakeSpawner::new(registry.clone());
    spawner.hang_on_shutdown.insert("engram".to_string());
    let spawner = Arc::new(spawner);

    let launcher = Launcher::new(config, registry.clone(), spawner.clone(), clock)
        .unwrap()
        .with_poll_interval_ms(100)
        .with_shutdown_grace_ms(100);

    let report = launcher.run().await;
    assert!(report.all_launched());

    launcher.shutdown().await;

    // Every component was unregistered with its current epoch
    for name in ["hermes", "engram", "athena", "prometheus"] {
        assert!(registry.get(&id(name)).await.unwrap().is_none());
    }

    // The hanging process was force-killed, the others exited in the grace
    let killed = spawner.killed.lock().unwrap().clone();
    assert_eq!(killed, vec!["engram".to_string()]);
}
