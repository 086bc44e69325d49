//! Dependency graph and launch-wave computation
//!
//! Components are launched in topological waves: every component in a wave
//! depends only on components from earlier waves, so members of one wave can
//! launch concurrently. A cycle anywhere in the graph is a configuration
//! error and nothing launches.

use crate::error::{OrchestratorError, OrchestratorResult};
use argos_core::{ComponentId, ComponentSpec};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Dependency graph over the configured component map
#[derive(Debug)]
pub struct DependencyGraph {
    /// Launch waves in dependency order, ids sorted within each wave
    waves: Vec<Vec<ComponentId>>,
    /// Direct dependencies of each component
    dependencies: HashMap<ComponentId, Vec<ComponentId>>,
}

impl DependencyGraph {
    /// Build the graph from a validated component map
    ///
    /// Uses Kahn's algorithm, peeling off one wave per iteration. Returns
    /// `CyclicDependency` if any components remain with unsatisfied
    /// in-edges after the peel.
    pub fn from_components(
        components: &BTreeMap<String, ComponentSpec>,
    ) -> OrchestratorResult<Self> {
        let mut dependencies: HashMap<ComponentId, Vec<ComponentId>> = HashMap::new();
        for (id, spec) in components {
            let id = ComponentId::new(id.clone()).map_err(|e| OrchestratorError::Internal {
                reason: e.to_string(),
            })?;

            let mut deps = Vec::with_capacity(spec.dependencies.len());
            for dep in &spec.dependencies {
                if !components.contains_key(dep) {
                    return Err(OrchestratorError::UnknownDependency {
                        component: id.to_string(),
                        dependency: dep.clone(),
                    });
                }
                deps.push(ComponentId::new(dep.clone()).map_err(|e| {
                    OrchestratorError::Internal {
                        reason: e.to_string(),
                    }
                })?);
            }
            dependencies.insert(id, deps);
        }

        let mut remaining: HashSet<ComponentId> = dependencies.keys().cloned().collect();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let mut wave: Vec<ComponentId> = remaining
                .iter()
                .filter(|id| {
                    dependencies[*id]
                        .iter()
                        .all(|dep| !remaining.contains(dep))
                })
                .cloned()
                .collect();

            if wave.is_empty() {
                // Every remaining component waits on another remaining one.
                // Report the lexicographically first for a stable message.
                let mut stuck: Vec<_> = remaining.iter().collect();
                stuck.sort();
                return Err(OrchestratorError::CyclicDependency {
                    component: stuck[0].to_string(),
                });
            }

            wave.sort();
            for id in &wave {
                remaining.remove(id);
            }
            waves.push(wave);
        }

        Ok(Self {
            waves,
            dependencies,
        })
    }

    /// Launch waves in dependency order
    pub fn waves(&self) -> &[Vec<ComponentId>] {
        &self.waves
    }

    /// Direct dependencies of a component
    pub fn dependencies_of(&self, id: &ComponentId) -> &[ComponentId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of components in the graph
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
