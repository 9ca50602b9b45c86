//! Default values for controller configuration.

/// Interval between metadata polls, in milliseconds.
pub(crate) const POLL_INTERVAL_MS: u64 = 1_000;
/// Number of metadata polls before giving up.
pub(crate) const POLL_MAX_ATTEMPTS: u32 = 60;
/// Environment variable overriding the poll interval.
pub(crate) const ENV_POLL_INTERVAL_MS: &str = "TETHER_POLL_INTERVAL_MS";
/// Environment variable overriding the poll attempt cap.
pub(crate) const ENV_POLL_MAX_ATTEMPTS: &str = "TETHER_POLL_MAX_ATTEMPTS";
/// Environment variable overriding the log level.
pub(crate) const ENV_LOG_LEVEL: &str = "TETHER_LOG_LEVEL";
