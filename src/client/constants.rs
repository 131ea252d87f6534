//! Constants used throughout the client application

/// Interval between interim statistics reports, in seconds
pub const REPORT_INTERVAL_SECS: u64 = 5;

/// Bounded wait for in-flight responses while draining, in milliseconds
pub const DRAIN_TIMEOUT_MS: u64 = 1000;

/// Pending requests older than this are treated as lost and evicted, in seconds
pub const PENDING_MAX_AGE_SECS: u64 = 30;

/// Progress display refresh interval, in milliseconds
pub const PROGRESS_TICK_INTERVAL_MS: u64 = 250;

/// Log a progress line every Nth accepted sample
pub const SAMPLE_LOG_EVERY: usize = 1000;
