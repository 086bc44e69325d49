//! Registry service
//!
//! Network-facing operations over the store: the single source of truth for
//! which components are alive. `LocalRegistry` is the in-process
//! implementation; remote callers go through an HTTP client implementing the
//! same `Registry` trait.

use crate::error::{RegistryError, RegistryResult};
use crate::store::ComponentStore;
use argos_core::{
    component, ComponentId, ComponentRecord, ComponentStatus, Epoch, RegistryConfig, TimeProvider,
    WallClockTime,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Registration payload
///
/// Credentials, when the deployment uses them, ride alongside this payload
/// at the transport layer; the registry itself does not interpret them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub name: String,
    pub version: String,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<argos_core::Capability>,
}

/// Discovery filter for `Registry::query`
///
/// With no status filter, gone records are excluded: a gone component must
/// not be discoverable as a dependency target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Only records advertising this capability name
    #[serde(default)]
    pub capability: Option<String>,
    /// Only records with exactly this status
    #[serde(default)]
    pub status: Option<ComponentStatus>,
}

impl QueryFilter {
    /// Filter for records advertising a capability
    pub fn by_capability(name: impl Into<String>) -> Self {
        Self {
            capability: Some(name.into()),
            status: None,
        }
    }

    /// Filter for records with a status
    pub fn by_status(status: ComponentStatus) -> Self {
        Self {
            capability: None,
            status: Some(status),
        }
    }

    fn matches(&self, record: &ComponentRecord) -> bool {
        if let Some(ref capability) = self.capability {
            if !record.has_capability(capability) {
                return false;
            }
        }

        match self.status {
            Some(status) => record.status == status,
            None => !record.status.is_terminal(),
        }
    }
}

/// The registry service interface
///
/// Implemented in-process by `LocalRegistry` and over HTTP by the server
/// crate's client. All operations are explicit and async; errors are
/// returned, never panicked.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a component, assigning a fresh epoch
    ///
    /// Validates the id format and endpoint shape; endpoint reachability is
    /// deliberately not checked at call time.
    async fn register(&self, registration: Registration) -> RegistryResult<Epoch>;

    /// Record a liveness signal for the given registration epoch
    ///
    /// Fails with `UnknownComponent` if the id was never registered and
    /// `StaleEpoch` if a newer registration exists; the caller must then
    /// fully re-register.
    async fn heartbeat(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<ComponentStatus>;

    /// Remove a registration, idempotently
    ///
    /// Succeeds even if the component is already gone; a stale epoch never
    /// removes a newer registration.
    async fn unregister(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<()>;

    /// Discovery interface for dependents and the orchestrator
    async fn query(&self, filter: &QueryFilter) -> RegistryResult<Vec<ComponentRecord>>;

    /// Look up a single record by id
    async fn get(&self, id: &ComponentId) -> RegistryResult<Option<ComponentRecord>>;
}

/// In-process registry service
pub struct LocalRegistry {
    store: ComponentStore,
    time: Arc<dyn TimeProvider>,
}

impl LocalRegistry {
    /// Create a registry with the wall clock
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_time(config, Arc::new(WallClockTime::new()))
    }

    /// Create a registry with an injected time provider
    pub fn with_time(config: RegistryConfig, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            store: ComponentStore::new(config),
            time,
        }
    }

    /// Access the underlying store
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Run one sweep pass, logging every transition
    pub async fn sweep(&self) -> usize {
        let now_ms = self.time.now_ms();
        let changes = self.store.sweep(now_ms).await;

        for (id, old_status, new_status) in &changes {
            tracing::info!(
                component = %id,
                from = %old_status,
                to = %new_status,
                "sweep demoted component"
            );
        }

        changes.len()
    }
}

/// Spawn the periodic sweep task
///
/// Runs until `shutdown` flips to true. The interval comes from the
/// registry's configuration.
pub fn spawn_sweeper(
    registry: Arc<LocalRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let interval_ms = registry.store.config().sweep_interval_ms;

    tokio::spawn(async move {
        loop {
            let sleep = registry.time.sleep_ms(interval_ms);
            tokio::select! {
                _ = sleep => {}
                changed = shutdown.changed() => {
                    // A dropped sender also means shutdown; anything else
                    // would spin on the closed channel.
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("sweeper shutting down");
                        return;
                    }
                }
            }
            registry.sweep().await;
        }
    })
}

#[async_trait]
impl Registry for LocalRegistry {
    async fn register(&self, registration: Registration) -> RegistryResult<Epoch> {
        let id = ComponentId::new(registration.id.clone())
            .map_err(|e| RegistryError::invalid_component(&registration.id, e.to_string()))?;

        component::validate_endpoint(&registration.endpoint)
            .map_err(|e| RegistryError::invalid_component(id.as_str(), e.to_string()))?;
        component::validate_capabilities(&registration.capabilities)
            .map_err(|e| RegistryError::invalid_component(id.as_str(), e.to_string()))?;

        let now_ms = self.time.now_ms();
        let epoch = self
            .store
            .begin_registration(
                id.clone(),
                registration.name,
                registration.version,
                registration.endpoint,
                registration.capabilities,
                now_ms,
            )
            .await;

        tracing::info!(component = %id, epoch = epoch.value(), "component registered");
        Ok(epoch)
    }

    async fn heartbeat(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<ComponentStatus> {
        let now_ms = self.time.now_ms();
        let status = self.store.touch(id, epoch, now_ms).await?;
        tracing::trace!(component = %id, epoch = epoch.value(), status = %status, "heartbeat");
        Ok(status)
    }

    async fn unregister(&self, id: &ComponentId, epoch: Epoch) -> RegistryResult<()> {
        let removed = self.store.remove_if_epoch(id, epoch).await;
        if removed {
            tracing::info!(component = %id, epoch = epoch.value(), "component unregistered");
        }
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter) -> RegistryResult<Vec<ComponentRecord>> {
        Ok(self.store.find(|record| filter.matches(record)).await)
    }

    async fn get(&self, id: &ComponentId) -> RegistryResult<Option<ComponentRecord>> {
        Ok(self.store.get(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_core::{Capability, MockClock};

    fn test_config() -> RegistryConfig {
        RegistryConfig {
            heartbeat_interval_ms: 100,
            stale_after_ms: 300,
            gone_after_ms: 1000,
            sweep_interval_ms: 100,
        }
    }

    fn test_registration(id: &str) -> Registration {
        Registration {
            id: id.into(),
            name: id.into(),
            version: "1.0.0".into(),
            endpoint: "127.0.0.1:7001".into(),
            capabilities: vec![Capability::new(format!("{}.serve", id), "")],
        }
    }

    fn test_id(name: &str) -> ComponentId {
        ComponentId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_register_assigns_incrementing_epochs() {
        let registry = LocalRegistry::new(test_config());

        let first = registry.register(test_registration("athena")).await.unwrap();
        assert_eq!(first, Epoch::first());

        let second = registry.register(test_registration("athena")).await.unwrap();
        assert_eq!(second, first.next());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_payloads() {
        let registry = LocalRegistry::new(test_config());

        let mut bad_id = test_registration("athena");
        bad_id.id = "".into();
        assert!(matches!(
            registry.register(bad_id).await,
            Err(RegistryError::InvalidComponent { .. })
        ));

        let mut bad_endpoint = test_registration("athena");
        bad_endpoint.endpoint = "not an endpoint".into();
        assert!(matches!(
            registry.register(bad_endpoint).await,
            Err(RegistryError::InvalidComponent { .. })
        ));
    }

    #[tokio::test]
    async fn test_heartbeat_lifecycle() {
        let registry = LocalRegistry::new(test_config());
        let id = test_id("athena");

        let epoch = registry.register(test_registration("athena")).await.unwrap();

        // Registered but not yet heartbeated: not a valid dependency target
        let record = registry.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, ComponentStatus::Registering);

        let status = registry.heartbeat(&id, epoch).await.unwrap();
        assert_eq!(status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_heartbeat_superseded_epoch_fails() {
        let registry = LocalRegistry::new(test_config());
        let id = test_id("athena");

        let old_epoch = registry.register(test_registration("athena")).await.unwrap();
        let new_epoch = registry.register(test_registration("athena")).await.unwrap();

        assert!(matches!(
            registry.heartbeat(&id, old_epoch).await,
            Err(RegistryError::StaleEpoch { .. })
        ));
        assert!(registry.heartbeat(&id, new_epoch).await.is_ok());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent_and_epoch_guarded() {
        let registry = LocalRegistry::new(test_config());
        let id = test_id("athena");

        let old_epoch = registry.register(test_registration("athena")).await.unwrap();
        let new_epoch = registry.register(test_registration("athena")).await.unwrap();

        // Stale epoch never removes a newer registration
        registry.unregister(&id, old_epoch).await.unwrap();
        assert!(registry.get(&id).await.unwrap().is_some());

        registry.unregister(&id, new_epoch).await.unwrap();
        assert!(registry.get(&id).await.unwrap().is_none());

        // Already gone: still succeeds
        registry.unregister(&id, new_epoch).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_filters() {
        let registry = LocalRegistry::new(test_config());

        let athena = registry.register(test_registration("athena")).await.unwrap();
        registry.register(test_registration("hermes")).await.unwrap();
        registry.heartbeat(&test_id("athena"), athena).await.unwrap();

        let healthy = registry
            .query(&QueryFilter::by_status(ComponentStatus::Healthy))
            .await
            .unwrap();
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].id, test_id("athena"));

        let by_capability = registry
            .query(&QueryFilter::by_capability("hermes.serve"))
            .await
            .unwrap();
        assert_eq!(by_capability.len(), 1);
        assert_eq!(by_capability[0].id, test_id("hermes"));

        let all = registry.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_gone_records_hidden_from_default_query() {
        let clock = Arc::new(MockClock::new(1000));
        let registry = LocalRegistry::with_time(test_config(), clock.clone());
        let id = test_id("athena");

        let epoch = registry.register(test_registration("athena")).await.unwrap();
        registry.heartbeat(&id, epoch).await.unwrap();

        clock.advance(1001);
        registry.sweep().await;

        let visible = registry.query(&QueryFilter::default()).await.unwrap();
        assert!(visible.is_empty());

        // Explicitly asking for gone records still works
        let gone = registry
            .query(&QueryFilter::by_status(ComponentStatus::Gone))
            .await
            .unwrap();
        assert_eq!(gone.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_task_runs_and_stops() {
        let clock = Arc::new(MockClock::new(1000));
        let registry = Arc::new(LocalRegistry::with_time(test_config(), clock.clone()));

        let epoch = registry.register(test_registration("athena")).await.unwrap();
        registry.heartbeat(&test_id("athena"), epoch).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweeper(registry.clone(), shutdown_rx);

        // MockClock sleeps advance time, so a few yields push the task past
        // the gone threshold.
        for _ in 0..50 {
            tokio::task::yield_now().await;
            if registry.query(&QueryFilter::default()).await.unwrap().is_empty() {
                break;
            }
        }
        assert!(registry.query(&QueryFilter::default()).await.unwrap().is_empty());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_sender_dropped() {
        let clock = Arc::new(MockClock::new(1000));
        let registry = Arc::new(LocalRegistry::with_time(test_config(), clock));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweeper(registry, shutdown_rx);

        drop(shutdown_tx);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("sweeper must stop once the shutdown sender is gone")
            .unwrap();
    }
}
