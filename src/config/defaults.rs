//! Default constants for router configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Cluster Defaults
// =============================================================================

/// Coordinator addresses used when nothing else is configured.
pub fn default_coordinators() -> Vec<String> {
    vec![
        "127.0.0.1:8081".to_string(),
        "127.0.0.1:8082".to_string(),
        "127.0.0.1:8083".to_string(),
        "127.0.0.1:8084".to_string(),
    ]
}

/// Fixed port every storage node listens on.
pub const DEFAULT_STORAGE_PORT: u16 = 9090;

// =============================================================================
// Timing Defaults
// =============================================================================

/// Pause before each coordinator request.
pub const DEFAULT_WARMUP_MS: u64 = 100;

/// Hard deadline for one coordinator routing attempt. On expiry the next
/// coordinator is tried.
pub const DEFAULT_COORDINATOR_TIMEOUT_MS: u64 = 1_000;

/// Deadline for one storage-node request. Expiry counts as a storage failure.
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

/// Deadline for one catalog (metadata) request to a coordinator.
pub const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Presentation Defaults
// =============================================================================

/// Number of most recent status messages kept in the feed.
pub const DEFAULT_FEED_CAPACITY: usize = 8;
