//! Configuration for Argos
//!
//! Explicit defaults backed by named constants, with validation. Heartbeat
//! interval, stale/gone thresholds, and launch timeouts are operational
//! tuning parameters exposed here rather than hard-coded.

use crate::component::ComponentId;
use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Interval between component heartbeats (milliseconds)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Absence after which a healthy record is demoted to stale (milliseconds)
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,

    /// Absence after which a stale record is demoted to gone (milliseconds)
    #[serde(default = "default_gone_after_ms")]
    pub gone_after_ms: u64,

    /// Interval between sweep passes (milliseconds)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    HEARTBEAT_INTERVAL_MS_DEFAULT
}

fn default_stale_after_ms() -> u64 {
    STALE_AFTER_MS_DEFAULT
}

fn default_gone_after_ms() -> u64 {
    GONE_AFTER_MS_DEFAULT
}

fn default_sweep_interval_ms() -> u64 {
    SWEEP_INTERVAL_MS_DEFAULT
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            stale_after_ms: default_stale_after_ms(),
            gone_after_ms: default_gone_after_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl RegistryConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms < HEARTBEAT_INTERVAL_MS_MIN
            || self.heartbeat_interval_ms > HEARTBEAT_INTERVAL_MS_MAX
        {
            return Err(Error::invalid_configuration(
                "registry.heartbeat_interval_ms",
                format!(
                    "{} outside [{}, {}]",
                    self.heartbeat_interval_ms, HEARTBEAT_INTERVAL_MS_MIN, HEARTBEAT_INTERVAL_MS_MAX
                ),
            ));
        }

        if self.stale_after_ms <= self.heartbeat_interval_ms {
            return Err(Error::invalid_configuration(
                "registry.stale_after_ms",
                "must be greater than heartbeat_interval_ms",
            ));
        }

        if self.gone_after_ms <= self.stale_after_ms {
            return Err(Error::invalid_configuration(
                "registry.gone_after_ms",
                "must be greater than stale_after_ms",
            ));
        }

        if self.sweep_interval_ms == 0 {
            return Err(Error::invalid_configuration(
                "registry.sweep_interval_ms",
                "must be non-zero",
            ));
        }

        Ok(())
    }
}

/// A single component entry in the orchestrator's component map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Command line used to spawn the component process
    pub launch_command: String,

    /// Component IDs that must be healthy before this one launches
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Per-component timeout waiting for the component to report healthy
    #[serde(default = "default_launch_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_launch_timeout_seconds() -> u64 {
    LAUNCH_TIMEOUT_SECONDS_DEFAULT
}

/// Orchestrator configuration: the component map plus registry tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Registry tuning
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Mapping from component id to its launch spec
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSpec>,
}

impl OrchestratorConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&contents).map_err(|e| match e {
            Error::ConfigParse { reason, .. } => Error::ConfigParse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(|e| Error::ConfigParse {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks registry tuning, component id format, launch commands, and that
    /// every dependency references a configured component. Cycle detection is
    /// the dependency graph's job, not config validation's.
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;

        if self.components.len() > COMPONENTS_COUNT_MAX {
            return Err(Error::invalid_configuration(
                "components",
                format!(
                    "{} components exceeds limit {}",
                    self.components.len(),
                    COMPONENTS_COUNT_MAX
                ),
            ));
        }

        for (id, spec) in &self.components {
            ComponentId::new(id.clone())?;

            if spec.launch_command.trim().is_empty() {
                return Err(Error::invalid_configuration(
                    format!("components.{}.launch_command", id),
                    "must be non-empty",
                ));
            }

            if spec.timeout_seconds == 0 {
                return Err(Error::invalid_configuration(
                    format!("components.{}.timeout_seconds", id),
                    "must be non-zero",
                ));
            }

            for dep in &spec.dependencies {
                if !self.components.contains_key(dep) {
                    return Err(Error::invalid_configuration(
                        format!("components.{}.dependencies", id),
                        format!("references unknown component '{}'", dep),
                    ));
                }
            }
        }

        Ok(())
    }
}
