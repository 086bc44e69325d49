//! Registry store
//!
//! Thread-safe storage and lookup of component records. The store
//! exclusively owns all records; every mutation flows through its
//! serialized operations, so concurrent callers observe a serializable view
//! per id. Reads take a shared lock and proceed concurrently with unrelated
//! writes.

use crate::error::{RegistryError, RegistryResult};
use argos_core::{
    Capability, ComponentId, ComponentRecord, ComponentStatus, Epoch, RegistryConfig,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory table of component records
///
/// All state is lost on restart; heartbeat monitors re-establish it by
/// re-registering.
#[derive(Debug)]
pub struct ComponentStore {
    records: RwLock<HashMap<ComponentId, ComponentRecord>>,
    config: RegistryConfig,
}

impl ComponentStore {
    /// Create an empty store with the given tuning
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the tuning configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Insert or update a record by id, guarded by epoch
    ///
    /// If the stored record's epoch is greater than the incoming one, the
    /// call is a no-op (guards against out-of-order delivery of stale
    /// registrations). Returns the resulting epoch either way.
    pub async fn upsert(&self, record: ComponentRecord) -> Epoch {
        let mut records = self.records.write().await;

        if let Some(existing) = records.get(&record.id) {
            if existing.registration_epoch > record.registration_epoch {
                return existing.registration_epoch;
            }
        }

        let epoch = record.registration_epoch;
        records.insert(record.id.clone(), record);
        epoch
    }

    /// Create a fresh registration epoch for a component
    ///
    /// Assigns `stored + 1`, or 1 if the id has never been seen. Epoch
    /// assignment and insertion happen under a single write lock so no two
    /// concurrent registrations can be granted the same epoch.
    pub async fn begin_registration(
        &self,
        id: ComponentId,
        name: String,
        version: String,
        endpoint: String,
        capabilities: Vec<Capability>,
        now_ms: u64,
    ) -> Epoch {
        let mut records = self.records.write().await;

        let epoch = records
            .get(&id)
            .map(|r| r.registration_epoch.next())
            .unwrap_or_else(Epoch::first);

        let record =
            ComponentRecord::new(id.clone(), name, version, endpoint, capabilities, epoch, now_ms);
        records.insert(id, record);
        epoch
    }

    /// Record a heartbeat for a component
    ///
    /// Fails with `StaleEpoch` unless `epoch` matches the stored epoch
    /// exactly; a failed touch never mutates the record. A gone record is
    /// treated as unknown: the caller must fully re-register.
    pub async fn touch(
        &self,
        id: &ComponentId,
        epoch: Epoch,
        now_ms: u64,
    ) -> RegistryResult<ComponentStatus> {
        let mut records = self.records.write().await;

        let record = records
            .get_mut(id)
            .ok_or_else(|| RegistryError::unknown_component(id))?;

        if record.status.is_terminal() {
            return Err(RegistryError::unknown_component(id));
        }

        if record.registration_epoch != epoch {
            return Err(RegistryError::stale_epoch(id, epoch, record.registration_epoch));
        }

        record.record_heartbeat(now_ms);
        Ok(record.status)
    }

    /// Remove a record unconditionally
    ///
    /// Returns true if a record was present.
    pub async fn remove(&self, id: &ComponentId) -> bool {
        let mut records = self.records.write().await;
        records.remove(id).is_some()
    }

    /// Remove a record only if the epoch matches the stored one
    ///
    /// A stale epoch is a no-op: it must never remove a newer registration.
    /// Returns true if a record was removed.
    pub async fn remove_if_epoch(&self, id: &ComponentId, epoch: Epoch) -> bool {
        let mut records = self.records.write().await;

        match records.get(id) {
            Some(record) if record.registration_epoch == epoch => {
                records.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Get a snapshot of a single record
    pub async fn get(&self, id: &ComponentId) -> Option<ComponentRecord> {
        let records = self.records.read().await;
        records.get(id).cloned()
    }

    /// Snapshot of all records matching a predicate
    pub async fn find<F>(&self, predicate: F) -> Vec<ComponentRecord>
    where
        F: Fn(&ComponentRecord) -> bool,
    {
        let records = self.records.read().await;
        let mut matched: Vec<_> = records.values().filter(|r| predicate(r)).cloned().collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched
    }

    /// Demote records that have missed their heartbeat thresholds
    ///
    /// `Healthy | Registering -> Stale` after `stale_after_ms`, then
    /// `Stale -> Gone` after `gone_after_ms`. Returns the transitions that
    /// occurred, for logging.
    pub async fn sweep(&self, now_ms: u64) -> Vec<(ComponentId, ComponentStatus, ComponentStatus)> {
        let mut records = self.records.write().await;
        let mut changes = Vec::new();

        for (id, record) in records.iter_mut() {
            let age_ms = record.heartbeat_age_ms(now_ms);
            let old_status = record.status;

            let new_status = match old_status {
                ComponentStatus::Gone => ComponentStatus::Gone,
                _ if age_ms > self.config.gone_after_ms => ComponentStatus::Gone,
                ComponentStatus::Healthy | ComponentStatus::Registering
                    if age_ms > self.config.stale_after_ms =>
                {
                    ComponentStatus::Stale
                }
                other => other,
            };

            if new_status != old_status {
                record.status = new_status;
                changes.push((id.clone(), old_status, new_status));
            }
        }

        changes
    }

    /// Number of records, including gone ones awaiting cleanup
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store has no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RegistryConfig {
        RegistryConfig {
            heartbeat_interval_ms: 100,
            stale_after_ms: 300,
            gone_after_ms: 1000,
            sweep_interval_ms: 100,
        }
    }

    fn test_id(name: &str) -> ComponentId {
        ComponentId::new(name).unwrap()
    }

    fn test_record(name: &str, epoch: u64, now_ms: u64) -> ComponentRecord {
        ComponentRecord::new(
            test_id(name),
            name.to_string(),
            "1.0.0",
            "127.0.0.1:7001",
            vec![Capability::new(format!("{}.serve", name), "")],
            Epoch::from(epoch),
            now_ms,
        )
    }

    #[tokio::test]
    async fn test_upsert_keeps_highest_epoch() {
        let store = ComponentStore::new(test_config());

        assert_eq!(store.upsert(test_record("athena", 3, 1000)).await.value(), 3);

        // Replayed lower epochs are no-ops, in any order
        assert_eq!(store.upsert(test_record("athena", 1, 2000)).await.value(), 3);
        assert_eq!(store.upsert(test_record("athena", 2, 3000)).await.value(), 3);

        let record = store.get(&test_id("athena")).await.unwrap();
        assert_eq!(record.registration_epoch.value(), 3);
        assert_eq!(record.last_heartbeat_ms, 1000);

        // A newer epoch replaces the record
        assert_eq!(store.upsert(test_record("athena", 4, 4000)).await.value(), 4);
    }

    #[tokio::test]
    async fn test_begin_registration_assigns_monotonic_epochs() {
        let store = ComponentStore::new(test_config());
        let id = test_id("hermes");

        let first = store
            .begin_registration(
                id.clone(),
                "Hermes".into(),
                "1.0.0".into(),
                "127.0.0.1:7001".into(),
                vec![],
                1000,
            )
            .await;
        assert_eq!(first, Epoch::first());

        let second = store
            .begin_registration(
                id.clone(),
                "Hermes".into(),
                "1.0.0".into(),
                "127.0.0.1:7001".into(),
                vec![],
                2000,
            )
            .await;
        assert_eq!(second, first.next());

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.status, ComponentStatus::Registering);
        assert_eq!(record.registration_epoch, second);
    }

    #[tokio::test]
    async fn test_touch_promotes_to_healthy() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 1, 1000)).await;

        let status = store
            .touch(&test_id("athena"), Epoch::from(1), 1100)
            .await
            .unwrap();
        assert_eq!(status, ComponentStatus::Healthy);

        let record = store.get(&test_id("athena")).await.unwrap();
        assert_eq!(record.last_heartbeat_ms, 1100);
    }

    #[tokio::test]
    async fn test_touch_stale_epoch_never_mutates() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 2, 1000)).await;

        let err = store
            .touch(&test_id("athena"), Epoch::from(1), 5000)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::StaleEpoch { .. }));

        let record = store.get(&test_id("athena")).await.unwrap();
        assert_eq!(record.last_heartbeat_ms, 1000);
        assert_eq!(record.status, ComponentStatus::Registering);
    }

    #[tokio::test]
    async fn test_touch_unknown_component() {
        let store = ComponentStore::new(test_config());
        let err = store
            .touch(&test_id("nonesuch"), Epoch::first(), 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownComponent { .. }));
    }

    #[tokio::test]
    async fn test_touch_gone_record_requires_reregistration() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 1, 1000)).await;
        store.touch(&test_id("athena"), Epoch::from(1), 1000).await.unwrap();

        // Push past the gone threshold
        store.sweep(1000 + 1001).await;

        let err = store
            .touch(&test_id("athena"), Epoch::from(1), 3000)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownComponent { .. }));
    }

    #[tokio::test]
    async fn test_sweep_demotes_by_thresholds() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 1, 1000)).await;
        store.touch(&test_id("athena"), Epoch::from(1), 1000).await.unwrap();

        // Within the stale threshold: no change
        assert!(store.sweep(1200).await.is_empty());

        // Past stale_after_ms: healthy -> stale
        let changes = store.sweep(1000 + 301).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].1, ComponentStatus::Healthy);
        assert_eq!(changes[0].2, ComponentStatus::Stale);

        // Past gone_after_ms: stale -> gone
        let changes = store.sweep(1000 + 1001).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].2, ComponentStatus::Gone);

        // Gone is terminal; further sweeps report nothing
        assert!(store.sweep(1000 + 5000).await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_recovers_after_touch() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 1, 1000)).await;
        store.touch(&test_id("athena"), Epoch::from(1), 1000).await.unwrap();

        store.sweep(1400).await; // stale
        let record = store.get(&test_id("athena")).await.unwrap();
        assert_eq!(record.status, ComponentStatus::Stale);

        // A heartbeat restores the record before it goes gone
        store.touch(&test_id("athena"), Epoch::from(1), 1500).await.unwrap();
        let record = store.get(&test_id("athena")).await.unwrap();
        assert_eq!(record.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_remove_if_epoch_stale_is_noop() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 2, 1000)).await;

        assert!(!store.remove_if_epoch(&test_id("athena"), Epoch::from(1)).await);
        assert!(store.get(&test_id("athena")).await.is_some());

        assert!(store.remove_if_epoch(&test_id("athena"), Epoch::from(2)).await);
        assert!(store.get(&test_id("athena")).await.is_none());

        // Removing an absent record is a no-op
        assert!(!store.remove_if_epoch(&test_id("athena"), Epoch::from(2)).await);
    }

    #[tokio::test]
    async fn test_find_by_capability() {
        let store = ComponentStore::new(test_config());
        store.upsert(test_record("athena", 1, 1000)).await;
        store.upsert(test_record("hermes", 1, 1000)).await;

        let matched = store.find(|r| r.has_capability("hermes.serve")).await;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, test_id("hermes"));

        let all = store.find(|_| true).await;
        assert_eq!(all.len(), 2);
        // Results are sorted by id for stable output
        assert_eq!(all[0].id, test_id("athena"));
    }
}
