//! Bounded wait for transfer metadata before progress can be displayed.
//!
//! A freshly added magnet reports a total length of zero until the metadata
//! exchange finishes. The poller re-reads the snapshot on a fixed interval and
//! gives up after a bounded number of attempts without touching the transfer.

use std::time::Duration;

use tether_config::ControllerConfig;
use tether_core::{ControllerError, ControllerResult, DownloadInfo, Gid};
use tracing::debug;

use crate::gateway::EngineGateway;

/// Interval and attempt cap for metadata polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive snapshot reads.
    pub interval: Duration,
    /// Total number of snapshot reads before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl PollPolicy {
    /// Policy carried by a controller configuration.
    #[must_use]
    pub const fn from_config(config: &ControllerConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts,
        }
    }
}

/// Polls a session snapshot until its total length is known.
#[derive(Clone)]
pub struct ProgressPoller {
    gateway: EngineGateway,
    policy: PollPolicy,
}

impl ProgressPoller {
    /// Poller reading snapshots through `gateway`.
    #[must_use]
    pub const fn new(gateway: EngineGateway, policy: PollPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Policy in effect.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Wait on the tokio timer until `gid` reports a non-zero total length.
    ///
    /// The first read happens immediately; later reads follow the policy
    /// interval.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::MetadataTimeout`] once the attempt cap is
    /// reached, or any error raised while reading the snapshot.
    pub async fn wait_for_metadata(&self, gid: Gid) -> ControllerResult<DownloadInfo> {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(info) = self.check(gid, attempt)? {
                return Ok(info);
            }
            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }
        Err(self.timeout(gid))
    }

    /// Blocking variant of [`ProgressPoller::wait_for_metadata`].
    ///
    /// Parks the calling thread between reads; never call it from the thread
    /// driving the engine loop.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressPoller::wait_for_metadata`].
    pub fn wait_for_metadata_blocking(&self, gid: Gid) -> ControllerResult<DownloadInfo> {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(info) = self.check(gid, attempt)? {
                return Ok(info);
            }
            if attempt < self.policy.max_attempts {
                std::thread::sleep(self.policy.interval);
            }
        }
        Err(self.timeout(gid))
    }

    fn check(&self, gid: Gid, attempt: u32) -> ControllerResult<Option<DownloadInfo>> {
        let info = self.gateway.download_info(gid)?;
        if info.has_metadata() {
            debug!(gid = %gid, attempt, total_length = info.total_length, "transfer metadata available");
            Ok(Some(info))
        } else {
            Ok(None)
        }
    }

    fn timeout(&self, gid: Gid) -> ControllerError {
        debug!(gid = %gid, attempts = self.policy.max_attempts, "gave up waiting for transfer metadata");
        ControllerError::MetadataTimeout {
            gid: gid.to_string(),
            attempts: self.policy.max_attempts,
        }
    }
}
