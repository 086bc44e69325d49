//! Argos Registry
//!
//! Component registration and discovery for Argos deployments.
//!
//! # Overview
//!
//! The registry provides:
//! - A thread-safe store of component records with registration epochs
//! - Register / heartbeat / unregister / query operations
//! - Periodic sweeping of records past their heartbeat thresholds
//! - A client-side heartbeat monitor that survives registry restarts

pub mod error;
pub mod monitor;
pub mod service;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use monitor::{HeartbeatMonitor, MonitorError, MonitorHandle, MonitorState};
pub use service::{spawn_sweeper, LocalRegistry, QueryFilter, Registration, Registry};
pub use store::ComponentStore;
