//! Notification sink that records every callback for later assertions.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tether_core::{Gid, LifecycleEvent, NotificationSink};

/// Sink appending `(gid, event)` pairs in delivery order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Gid, LifecycleEvent)>>,
    arrived: Condvar,
}

impl RecordingSink {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<(Gid, LifecycleEvent)> {
        self.events.lock().clone()
    }

    /// Events recorded for one session, in delivery order.
    #[must_use]
    pub fn events_for(&self, gid: Gid) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(seen, _)| *seen == gid)
            .map(|(_, event)| *event)
            .collect()
    }

    /// Block until at least `count` events were recorded or `timeout` passes.
    /// Returns whatever was recorded by then.
    #[must_use]
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(Gid, LifecycleEvent)> {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < count {
            if self.arrived.wait_until(&mut events, deadline).timed_out() {
                break;
            }
        }
        events.clone()
    }

    fn record(&self, gid: Gid, event: LifecycleEvent) {
        self.events.lock().push((gid, event));
        self.arrived.notify_all();
    }
}

impl NotificationSink for RecordingSink {
    fn on_start(&self, gid: Gid) {
        self.record(gid, LifecycleEvent::Start);
    }

    fn on_pause(&self, gid: Gid) {
        self.record(gid, LifecycleEvent::Pause);
    }

    fn on_stop(&self, gid: Gid) {
        self.record(gid, LifecycleEvent::Stop);
    }

    fn on_complete(&self, gid: Gid) {
        self.record(gid, LifecycleEvent::Complete);
    }

    fn on_error(&self, gid: Gid) {
        self.record(gid, LifecycleEvent::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_for_sees_events_from_other_threads() {
        let sink = Arc::new(RecordingSink::new());
        let producer = Arc::clone(&sink);
        let worker = thread::spawn(move || {
            producer.on_start(Gid::from_raw(1));
            producer.on_complete(Gid::from_raw(1));
        });

        let events = sink.wait_for(2, Duration::from_secs(5));
        worker.join().expect("producer thread");
        assert_eq!(
            events,
            vec![
                (Gid::from_raw(1), LifecycleEvent::Start),
                (Gid::from_raw(1), LifecycleEvent::Complete),
            ]
        );
    }

    #[test]
    fn wait_for_returns_partial_results_on_timeout() {
        let sink = RecordingSink::new();
        sink.on_pause(Gid::from_raw(9));
        let events = sink.wait_for(3, Duration::from_millis(10));
        assert_eq!(events.len(), 1);
        assert_eq!(sink.events_for(Gid::from_raw(9)), vec![LifecycleEvent::Pause]);
    }
}
