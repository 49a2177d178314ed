//! Fixed cutoffs used by threshold-based rules.
//!
//! Changing a value here changes what a rule id means; statistics recorded
//! under the old value will be misattributed.

/// `sigtermCount` at which terminations are considered a loop.
pub const SIGTERM_LOOP_COUNT: u64 = 3;

/// `handshakeFailures` at which reconnect attempts are considered spam.
pub const HANDSHAKE_SPAM_COUNT: u64 = 10;

/// `errorCount` at which recent errors are considered a burst.
pub const ERROR_BURST_COUNT: u64 = 25;

/// Log size (MiB) at which the gateway log is considered too large.
pub const LARGE_LOG_MB: u64 = 100;

/// `memoryFileCount` at which the memory folder is considered bloated.
pub const MEMORY_BLOAT_FILES: u64 = 500;

/// Restarts after which a short-lived or stopped gateway is flagged.
pub const EXTENDED_DOWNTIME_RESTARTS: u64 = 5;

/// Uptime (seconds) under which a running gateway still counts as flapping.
pub const EXTENDED_DOWNTIME_MIN_UPTIME_SECS: u64 = 300;

/// Oldest supported Node.js major version.
pub const MIN_NODE_MAJOR: u64 = 22;

pub const fn large_log_bytes() -> u64 {
    LARGE_LOG_MB * 1024 * 1024
}
