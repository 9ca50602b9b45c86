//! Notification sinks receiving session lifecycle callbacks.
//!
//! Sinks are invoked synchronously on the engine's own thread. Implementations
//! must return quickly and hand any real work off to another thread or task;
//! blocking here stalls the engine's event loop.

use tether_events::{EventBus, LifecycleEvent};

use crate::gid::Gid;

/// Handler for the lifecycle events of every session owned by a controller.
pub trait NotificationSink: Send + Sync {
    /// A session began transferring.
    fn on_start(&self, gid: Gid);
    /// A session was paused.
    fn on_pause(&self, gid: Gid);
    /// A session was stopped.
    fn on_stop(&self, gid: Gid);
    /// A session completed, including torrent completion.
    fn on_complete(&self, gid: Gid);
    /// A session terminated with an error.
    fn on_error(&self, gid: Gid);
}

/// Invoke the sink method matching `event`.
pub fn deliver(sink: &dyn NotificationSink, gid: Gid, event: LifecycleEvent) {
    match event {
        LifecycleEvent::Start => sink.on_start(gid),
        LifecycleEvent::Pause => sink.on_pause(gid),
        LifecycleEvent::Stop => sink.on_stop(gid),
        LifecycleEvent::Complete => sink.on_complete(gid),
        LifecycleEvent::Error => sink.on_error(gid),
    }
}

/// Sink that discards every event. Installed until the application sets its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn on_start(&self, _gid: Gid) {}
    fn on_pause(&self, _gid: Gid) {}
    fn on_stop(&self, _gid: Gid) {}
    fn on_complete(&self, _gid: Gid) {}
    fn on_error(&self, _gid: Gid) {}
}

/// Sink that republishes callbacks on an [`EventBus`] for async consumers.
#[derive(Clone)]
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    /// Forward callbacks to `bus`.
    #[must_use]
    pub const fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Bus the sink publishes to.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn publish(&self, gid: Gid, event: LifecycleEvent) {
        let _ = self.bus.publish(gid.to_string(), event);
    }
}

impl NotificationSink for BusSink {
    fn on_start(&self, gid: Gid) {
        self.publish(gid, LifecycleEvent::Start);
    }

    fn on_pause(&self, gid: Gid) {
        self.publish(gid, LifecycleEvent::Pause);
    }

    fn on_stop(&self, gid: Gid) {
        self.publish(gid, LifecycleEvent::Stop);
    }

    fn on_complete(&self, gid: Gid) {
        self.publish(gid, LifecycleEvent::Complete);
    }

    fn on_error(&self, gid: Gid) {
        self.publish(gid, LifecycleEvent::Error);
    }
}
