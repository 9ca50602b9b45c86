//! Routing of engine lifecycle callbacks to the controller's notification sink.
//!
//! # Design
//! - The engine reports `(handle, id, code)` on its own thread; nothing here
//!   blocks beyond a read lock on the sink cell.
//! - The sink is cloned out of its cell before delivery so a sink may replace
//!   itself (or be replaced) from within a callback without deadlocking.
//! - Unknown codes and stale handles are dropped, logged at debug, and counted.

use std::sync::Arc;

use parking_lot::RwLock;
use tether_core::{Gid, LifecycleEvent, NotificationSink, NullSink, deliver};
use tether_telemetry::Metrics;
use tracing::debug;

use crate::registry::{self, ControllerHandle};

/// Engine code for a download that began transferring.
pub const EVENT_START: i32 = 1;
/// Engine code for a paused download.
pub const EVENT_PAUSE: i32 = 2;
/// Engine code for a stopped download.
pub const EVENT_STOP: i32 = 3;
/// Engine code for a completed download.
pub const EVENT_COMPLETE: i32 = 4;
/// Engine code for a download that failed.
pub const EVENT_ERROR: i32 = 5;
/// Engine code for a completed torrent download.
pub const EVENT_BT_COMPLETE: i32 = 6;

/// Map an engine event code to a lifecycle event.
///
/// Torrent completion collapses into [`LifecycleEvent::Complete`].
#[must_use]
pub const fn translate_event_code(code: i32) -> Option<LifecycleEvent> {
    match code {
        EVENT_START => Some(LifecycleEvent::Start),
        EVENT_PAUSE => Some(LifecycleEvent::Pause),
        EVENT_STOP => Some(LifecycleEvent::Stop),
        EVENT_COMPLETE | EVENT_BT_COMPLETE => Some(LifecycleEvent::Complete),
        EVENT_ERROR => Some(LifecycleEvent::Error),
        _ => None,
    }
}

/// Per-controller dispatch point resolved through the handle registry.
pub struct EventBridge {
    sink: RwLock<Arc<dyn NotificationSink>>,
    metrics: Option<Metrics>,
}

impl EventBridge {
    /// Bridge with a [`NullSink`] installed.
    #[must_use]
    pub fn new(metrics: Option<Metrics>) -> Self {
        Self {
            sink: RwLock::new(Arc::new(NullSink)),
            metrics,
        }
    }

    /// Replace the installed sink; later events go to `sink`.
    pub fn set_sink(&self, sink: Arc<dyn NotificationSink>) {
        *self.sink.write() = sink;
    }

    /// Reinstall the [`NullSink`].
    pub fn reset_sink(&self) {
        self.set_sink(Arc::new(NullSink));
    }

    /// Deliver one engine event to the current sink.
    pub fn dispatch(&self, id: u64, code: i32) {
        let Some(event) = translate_event_code(code) else {
            debug!(gid = %Gid::from_raw(id), code, "ignoring unknown engine event code");
            self.record_dropped("unknown_code");
            return;
        };
        let sink = Arc::clone(&*self.sink.read());
        deliver(sink.as_ref(), Gid::from_raw(id), event);
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatched(event.kind());
        }
    }

    fn record_dropped(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_dropped(reason);
        }
    }
}

/// Entry point the engine calls for every lifecycle event.
///
/// `handle` is the value handed to the engine at initialisation. Events for a
/// controller that has since been dropped are discarded.
pub fn notify_event(handle: ControllerHandle, id: u64, code: i32) {
    match registry::lookup(handle) {
        Some(bridge) => bridge.dispatch(id, code),
        None => debug!(%handle, gid = %Gid::from_raw(id), code, "dropping event for released controller"),
    }
}
