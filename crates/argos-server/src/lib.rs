//! Argos Server
//!
//! HTTP surface for the Argos registry: an axum router exposing
//! register / heartbeat / unregister / query over a `LocalRegistry`, and a
//! reqwest client implementing the `Registry` trait for remote callers.

pub mod api;
pub mod client;

pub use api::{router, AppState};
pub use client::HttpRegistryClient;
