//! Application-facing façade over one engine session.
//!
//! # Design
//! - Construction registers an [`EventBridge`] before the engine is
//!   initialised, so the handle the engine stores is valid from its first
//!   callback until the controller is dropped.
//! - Drop deregisters first and finalises second; callbacks racing teardown
//!   resolve to nothing instead of a dangling controller.
//! - Identifiers are accepted as [`Gid`] or hex text through [`IntoGid`]; a
//!   malformed hex string fails before any engine command is issued.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tether_config::ControllerConfig;
use tether_core::{
    ControllerResult, DownloadInfo, Gid, IntoGid, NotificationSink, OptionSet, TorrentMetadata,
};
use tether_telemetry::Metrics;
use tracing::{info, warn};

use crate::bridge::EventBridge;
use crate::gateway::EngineGateway;
use crate::native::NativeEngine;
use crate::poller::{PollPolicy, ProgressPoller};
use crate::registry::{self, ControllerHandle};

/// Name given to the thread started by [`SessionController::spawn_engine_thread`].
pub const ENGINE_THREAD_NAME: &str = "tether-engine";

/// Owns one engine session and routes its events to a notification sink.
pub struct SessionController {
    gateway: EngineGateway,
    bridge: Arc<EventBridge>,
    handle: ControllerHandle,
    policy: PollPolicy,
    shut_down: AtomicBool,
}

impl SessionController {
    /// Initialise `engine` with the settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::EngineInit`] when the engine
    /// fails to initialise.
    pub fn new(engine: Arc<dyn NativeEngine>, config: &ControllerConfig) -> ControllerResult<Self> {
        Self::with_metrics(engine, config, None)
    }

    /// Same as [`SessionController::new`], recording commands and event
    /// delivery on `metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::EngineInit`] when the engine
    /// fails to initialise.
    pub fn with_metrics(
        engine: Arc<dyn NativeEngine>,
        config: &ControllerConfig,
        metrics: Option<Metrics>,
    ) -> ControllerResult<Self> {
        let bridge = Arc::new(EventBridge::new(metrics.clone()));
        let handle = registry::register(&bridge);
        let gateway = EngineGateway::new(engine, metrics);
        if let Err(err) = gateway.init(handle, &config.global_options) {
            registry::deregister(handle);
            return Err(err);
        }
        info!(%handle, "session controller initialised");
        Ok(Self {
            gateway,
            bridge,
            handle,
            policy: PollPolicy::from_config(config),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Registry handle the engine reports events under.
    #[must_use]
    pub const fn handle(&self) -> ControllerHandle {
        self.handle
    }

    /// Typed engine wrapper used by this controller.
    #[must_use]
    pub const fn gateway(&self) -> &EngineGateway {
        &self.gateway
    }

    /// Install the sink receiving lifecycle events, replacing the current one.
    pub fn set_notifier(&self, sink: Arc<dyn NotificationSink>) {
        self.bridge.set_sink(sink);
    }

    /// Discard lifecycle events from now on.
    pub fn clear_notifier(&self) {
        self.bridge.reset_sink();
    }

    /// Run the engine loop on the calling thread until the engine shuts down.
    pub fn start(&self) {
        self.gateway.run();
    }

    /// Run the engine loop on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns the operating system error if the thread cannot be spawned.
    pub fn spawn_engine_thread(&self) -> io::Result<JoinHandle<()>> {
        let gateway = self.gateway.clone();
        thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .spawn(move || gateway.run())
    }

    /// Register a URI download with no per-session options.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::AddFailed`] when the engine
    /// rejects the URI.
    pub fn add_uri(&self, uri: &str) -> ControllerResult<Gid> {
        self.gateway.add_uri(uri, &OptionSet::new())
    }

    /// Register a URI download with per-session options.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::AddFailed`] when the engine
    /// rejects the URI and [`tether_core::ControllerError::MalformedOptions`]
    /// when an option contains the wire separator.
    pub fn add_uri_with_options(&self, uri: &str, options: &OptionSet) -> ControllerResult<Gid> {
        self.gateway.add_uri(uri, options)
    }

    /// Read torrent metadata without creating a session.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::ParseFailed`] for unreadable or
    /// invalid torrent files.
    pub fn parse_torrent(&self, path: impl AsRef<Path>) -> ControllerResult<TorrentMetadata> {
        self.gateway.parse_torrent(path.as_ref())
    }

    /// Register a torrent download.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::AddFailed`] when the engine
    /// rejects the torrent.
    pub fn add_torrent(
        &self,
        path: impl AsRef<Path>,
        options: &OptionSet,
    ) -> ControllerResult<Gid> {
        self.gateway.add_torrent(path.as_ref(), options)
    }

    /// Change options of one session.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers and [`tether_core::ControllerError::OptionChangeFailed`]
    /// when the engine rejects the change.
    pub fn change_options(&self, gid: impl IntoGid, options: &OptionSet) -> ControllerResult<()> {
        self.gateway.change_options(gid.into_gid()?, options)
    }

    /// Read options of one session.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers and [`tether_core::ControllerError::OptionsUnavailable`]
    /// for sessions the engine does not know.
    pub fn get_options(&self, gid: impl IntoGid) -> ControllerResult<OptionSet> {
        self.gateway.get_options(gid.into_gid()?)
    }

    /// Change engine-wide options.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::OptionChangeFailed`] when the
    /// engine rejects the change.
    pub fn change_global_options(&self, options: &OptionSet) -> ControllerResult<()> {
        self.gateway.change_global_options(options)
    }

    /// Read engine-wide options.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::MalformedOptions`] when the
    /// engine output cannot be decoded.
    pub fn get_global_options(&self) -> ControllerResult<OptionSet> {
        self.gateway.get_global_options()
    }

    /// Pause a session; `Ok(false)` when the engine refuses.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers.
    pub fn pause(&self, gid: impl IntoGid) -> ControllerResult<bool> {
        Ok(self.gateway.pause(gid.into_gid()?))
    }

    /// Resume a paused session; `Ok(false)` when the engine refuses.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers.
    pub fn resume(&self, gid: impl IntoGid) -> ControllerResult<bool> {
        Ok(self.gateway.resume(gid.into_gid()?))
    }

    /// Remove a session, stopping download and seeding; `Ok(false)` when the
    /// engine refuses.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers.
    pub fn remove(&self, gid: impl IntoGid) -> ControllerResult<bool> {
        Ok(self.gateway.remove(gid.into_gid()?))
    }

    /// Snapshot a session. Unknown sessions yield a zero-valued snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::InvalidFormat`] for malformed
    /// identifiers and [`tether_core::ControllerError::UnknownStatus`] for
    /// status codes outside the known set.
    pub fn download_info(&self, gid: impl IntoGid) -> ControllerResult<DownloadInfo> {
        self.gateway.download_info(gid.into_gid()?)
    }

    /// Poller bound to this controller's engine and configured policy.
    #[must_use]
    pub fn progress_poller(&self) -> ProgressPoller {
        ProgressPoller::new(self.gateway.clone(), self.policy)
    }

    /// Wait until `gid` reports a non-zero total length.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::MetadataTimeout`] when the
    /// configured attempt cap is reached.
    pub async fn wait_for_metadata(
        &self,
        gid: impl IntoGid + Send,
    ) -> ControllerResult<DownloadInfo> {
        let gid = gid.into_gid()?;
        self.progress_poller().wait_for_metadata(gid).await
    }

    /// Blocking variant of [`SessionController::wait_for_metadata`].
    ///
    /// # Errors
    ///
    /// Same as [`SessionController::wait_for_metadata`].
    pub fn wait_for_metadata_blocking(&self, gid: impl IntoGid) -> ControllerResult<DownloadInfo> {
        self.progress_poller().wait_for_metadata_blocking(gid.into_gid()?)
    }

    /// Finalise the engine session. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ControllerError::EngineShutdown`] when the
    /// engine reports a failure.
    pub fn shutdown(&self) -> ControllerResult<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(handle = %self.handle, "shutting down session controller");
        self.gateway.deinit()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        registry::deregister(self.handle);
        if let Err(err) = self.shutdown() {
            warn!(error = %err, handle = %self.handle, "engine shutdown failed during drop");
        }
    }
}
