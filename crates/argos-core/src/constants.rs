//! Limit constants for Argos
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Component Limits
// =============================================================================

/// Maximum length of a component ID in bytes
pub const COMPONENT_ID_LENGTH_BYTES_MAX: usize = 128;

/// Maximum length of a component name in bytes
pub const COMPONENT_NAME_LENGTH_BYTES_MAX: usize = 256;

/// Maximum length of an endpoint string in bytes
pub const ENDPOINT_LENGTH_BYTES_MAX: usize = 512;

/// Maximum number of capabilities a component may advertise
pub const CAPABILITIES_COUNT_MAX: usize = 64;

/// Maximum number of components a single registry tracks
pub const COMPONENTS_COUNT_MAX: usize = 1024;

// =============================================================================
// Heartbeat and Sweep Timing
// =============================================================================

/// Default heartbeat interval in milliseconds (1 sec)
pub const HEARTBEAT_INTERVAL_MS_DEFAULT: u64 = 1000;

/// Minimum heartbeat interval in milliseconds
pub const HEARTBEAT_INTERVAL_MS_MIN: u64 = 100;

/// Maximum heartbeat interval in milliseconds (1 min)
pub const HEARTBEAT_INTERVAL_MS_MAX: u64 = 60_000;

/// Default absence before a healthy record is demoted to stale (3 sec)
pub const STALE_AFTER_MS_DEFAULT: u64 = 3 * HEARTBEAT_INTERVAL_MS_DEFAULT;

/// Default absence before a stale record is demoted to gone (10 sec)
pub const GONE_AFTER_MS_DEFAULT: u64 = 10 * HEARTBEAT_INTERVAL_MS_DEFAULT;

/// Default interval between registry sweep passes (1 sec)
pub const SWEEP_INTERVAL_MS_DEFAULT: u64 = 1000;

// =============================================================================
// Orchestrator Timing
// =============================================================================

/// Default per-component launch timeout in seconds
pub const LAUNCH_TIMEOUT_SECONDS_DEFAULT: u64 = 30;

/// Default interval between health polls while waiting for launch (250 ms)
pub const HEALTH_POLL_INTERVAL_MS_DEFAULT: u64 = 250;

/// Grace period before a shutdown falls back to forced termination (5 sec)
pub const SHUTDOWN_GRACE_MS_DEFAULT: u64 = 5000;

// Compile-time assertions for constant validity
const _: () = {
    assert!(COMPONENT_ID_LENGTH_BYTES_MAX >= 64);
    assert!(STALE_AFTER_MS_DEFAULT > HEARTBEAT_INTERVAL_MS_DEFAULT);
    assert!(GONE_AFTER_MS_DEFAULT > STALE_AFTER_MS_DEFAULT);
    assert!(HEARTBEAT_INTERVAL_MS_MIN < HEARTBEAT_INTERVAL_MS_MAX);
    assert!(LAUNCH_TIMEOUT_SECONDS_DEFAULT >= 1);
};
