//! Component records, capabilities, and registration epochs
//!
//! A component is an independently deployed unit of functionality. Its
//! registry record carries a registration epoch: a monotonically increasing
//! counter incremented on every (re-)registration, used to reject heartbeats
//! and unregisters from superseded registrations.

use crate::constants::{
    CAPABILITIES_COUNT_MAX, COMPONENT_ID_LENGTH_BYTES_MAX, ENDPOINT_LENGTH_BYTES_MAX,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a component
///
/// Component IDs are assigned at configuration time and stay stable across
/// restarts of the same logical component; they are never reused for a
/// different one.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ComponentId(String);

impl ComponentId {
    /// Create a new ComponentId with validation
    ///
    /// # Errors
    /// Returns error if id is empty, too long, or contains invalid characters
    /// (allowed: alphanumeric, dash, underscore, dot).
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidComponentId {
                id,
                reason: "component ID cannot be empty".into(),
            });
        }

        if id.len() > COMPONENT_ID_LENGTH_BYTES_MAX {
            return Err(Error::InvalidComponentId {
                id: id.clone(),
                reason: format!(
                    "component ID length {} exceeds limit {}",
                    id.len(),
                    COMPONENT_ID_LENGTH_BYTES_MAX
                ),
            });
        }

        let valid = id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.');

        if !valid {
            return Err(Error::InvalidComponentId {
                id: id.clone(),
                reason: "component ID contains invalid characters".into(),
            });
        }

        Ok(Self(id))
    }

    /// Get the component ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registration epoch
///
/// Monotonically increasing per component ID. A registry restart loses all
/// epochs; re-registration always assigns `stored + 1` or starts over at 1.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    /// The epoch assigned to a component's first registration
    pub fn first() -> Self {
        Self(1)
    }

    /// The epoch following this one
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Epoch {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Component status in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Registered but no heartbeat recorded yet for the current epoch
    Registering,
    /// At least one heartbeat recorded; valid dependency target
    Healthy,
    /// Missed the stale threshold; still tracked
    Stale,
    /// Missed the absence threshold or explicitly unregistered
    Gone,
}

impl ComponentStatus {
    /// Check whether dependents may treat this component as available
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check whether the record has reached its terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Gone)
    }

    /// Parse from the snake_case wire representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registering" => Some(Self::Registering),
            "healthy" => Some(Self::Healthy),
            "stale" => Some(Self::Stale),
            "gone" => Some(Self::Gone),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registering => write!(f, "registering"),
            Self::Healthy => write!(f, "healthy"),
            Self::Stale => write!(f, "stale"),
            Self::Gone => write!(f, "gone"),
        }
    }
}

/// A named operation a component advertises to others
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name, e.g. "memory.store"
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON schema of the capability's parameters
    #[serde(default)]
    pub parameter_schema: serde_json::Value,
}

impl Capability {
    /// Create a capability with an empty parameter schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: serde_json::Value::Null,
        }
    }
}

/// A component's registry record
///
/// Owned exclusively by the registry store; all mutation flows through
/// registry operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Unique component identifier
    pub id: ComponentId,
    /// Descriptive name
    pub name: String,
    /// Component version string
    pub version: String,
    /// Reachable address (host:port or URI)
    pub endpoint: String,
    /// Capabilities advertised at registration, read-only for the epoch
    pub capabilities: Vec<Capability>,
    /// Current lifecycle status
    pub status: ComponentStatus,
    /// Time of last liveness confirmation (Unix ms)
    pub last_heartbeat_ms: u64,
    /// Current registration epoch
    pub registration_epoch: Epoch,
}

impl ComponentRecord {
    /// Create a fresh record for a new registration epoch
    pub fn new(
        id: ComponentId,
        name: impl Into<String>,
        version: impl Into<String>,
        endpoint: impl Into<String>,
        capabilities: Vec<Capability>,
        epoch: Epoch,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            endpoint: endpoint.into(),
            capabilities,
            status: ComponentStatus::Registering,
            last_heartbeat_ms: now_ms,
            registration_epoch: epoch,
        }
    }

    /// Record a heartbeat, promoting to healthy
    ///
    /// `last_heartbeat_ms` never moves backwards within an epoch.
    pub fn record_heartbeat(&mut self, now_ms: u64) {
        if now_ms >= self.last_heartbeat_ms {
            self.last_heartbeat_ms = now_ms;
        }
        self.status = ComponentStatus::Healthy;
    }

    /// Check whether this record advertises the named capability
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }

    /// Milliseconds since the last heartbeat
    pub fn heartbeat_age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_heartbeat_ms)
    }
}

/// Validate an endpoint string
///
/// Accepts `host:port` or a URI with a scheme (`scheme://rest`). Endpoint
/// reachability is deliberately not checked here.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(Error::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: "endpoint cannot be empty".into(),
        });
    }

    if endpoint.len() > ENDPOINT_LENGTH_BYTES_MAX {
        return Err(Error::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: format!(
                "endpoint length {} exceeds limit {}",
                endpoint.len(),
                ENDPOINT_LENGTH_BYTES_MAX
            ),
        });
    }

    if let Some((scheme, rest)) = endpoint.split_once("://") {
        if scheme.is_empty() || rest.is_empty() {
            return Err(Error::InvalidEndpoint {
                endpoint: endpoint.into(),
                reason: "URI must have a scheme and an authority".into(),
            });
        }
        return Ok(());
    }

    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(Error::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: "expected host:port or a URI with a scheme".into(),
        }),
    }
}

/// Validate a capability list
pub fn validate_capabilities(capabilities: &[Capability]) -> Result<()> {
    if capabilities.len() > CAPABILITIES_COUNT_MAX {
        return Err(Error::invalid_configuration(
            "capabilities",
            format!(
                "{} capabilities exceeds limit {}",
                capabilities.len(),
                CAPABILITIES_COUNT_MAX
            ),
        ));
    }

    for capability in capabilities {
        if capability.name.is_empty() {
            return Err(Error::invalid_configuration(
                "capabilities",
                "capability name cannot be empty",
            ));
        }
    }

    Ok(())
}
