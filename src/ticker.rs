use std::time::Duration;

/// Suggested tick interval for host schedulers, in milliseconds. The timer
/// engine stays correct at any cadence; this is only a display-freshness
/// hint.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Get tick duration
pub fn tick_duration() -> Duration {
    Duration::from_millis(DEFAULT_TICK_MS)
}
