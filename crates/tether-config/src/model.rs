//! Typed controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::OptionSet;
use tether_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig};

use crate::defaults::{POLL_INTERVAL_MS, POLL_MAX_ATTEMPTS};

/// Settings consumed when constructing a session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Engine-wide options applied when the engine is initialised.
    pub global_options: OptionSet,
    /// Interval between metadata polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of metadata polls before giving up.
    pub poll_max_attempts: u32,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format (`pretty` or `json`); inferred from the build when absent.
    pub log_format: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            global_options: OptionSet::new(),
            poll_interval_ms: POLL_INTERVAL_MS,
            poll_max_attempts: POLL_MAX_ATTEMPTS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: None,
        }
    }
}

impl ControllerConfig {
    /// Interval between metadata polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Logging settings derived from this configuration.
    #[must_use]
    pub fn logging(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.log_level,
            format: LogFormat::from_name(self.log_format.as_deref()),
        }
    }
}
