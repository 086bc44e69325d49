//! Argos startup orchestrator
//!
//! Reads the component map, computes dependency-ordered launch waves, spawns
//! component processes, and confirms each one registers and reports healthy
//! before its dependents launch.

pub mod error;
pub mod graph;
pub mod launcher;
pub mod process;

pub use error::{OrchestratorError, OrchestratorResult};
pub use graph::DependencyGraph;
pub use launcher::{LaunchReport, Launcher};
pub use process::{ProcessHandle, ProcessSpawner, TokioSpawner};
