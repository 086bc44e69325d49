//! Argos Core
//!
//! Shared vocabulary for the Argos component lifecycle orchestrator:
//!
//! - Component records, capabilities, and registration epochs
//! - Explicit limit constants
//! - Configuration with validation
//! - I/O abstraction layer (time) for deterministic testing

pub mod component;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;

pub use component::{Capability, ComponentId, ComponentRecord, ComponentStatus, Epoch};
pub use config::{ComponentSpec, OrchestratorConfig, RegistryConfig};
pub use error::{Error, Result};
pub use io::{MockClock, TimeProvider, WallClockTime};
