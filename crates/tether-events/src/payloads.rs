//! Event payload types carried from the engine bridge to application consumers.

use chrono::{DateTime, Utc};

/// Identifier assigned to each envelope published on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Lifecycle transitions reported by the download engine for a session.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The session began transferring.
    Start,
    /// The session was paused.
    Pause,
    /// The session was stopped.
    Stop,
    /// The session finished, including torrent completion.
    Complete,
    /// The session terminated with an error.
    Error,
}

impl LifecycleEvent {
    /// Every lifecycle event, in engine code order.
    pub const ALL: [Self; 5] = [
        Self::Start,
        Self::Pause,
        Self::Stop,
        Self::Complete,
        Self::Error,
    ];

    /// Machine-friendly discriminator used for logs and metric labels.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Whether the event ends the session's transfer activity.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Metadata wrapper around a lifecycle event.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Time the bus accepted the event.
    pub timestamp: DateTime<Utc>,
    /// Hex form of the session identifier the event belongs to.
    pub gid: String,
    /// Lifecycle transition carried by the envelope.
    pub event: LifecycleEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_unique() {
        let mut kinds: Vec<_> = LifecycleEvent::ALL.iter().map(|event| event.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), LifecycleEvent::ALL.len());
    }

    #[test]
    fn envelope_serializes_snake_case_event() {
        let envelope = EventEnvelope {
            id: 7,
            timestamp: Utc::now(),
            gid: "2089b05ecca3d829".to_string(),
            event: LifecycleEvent::Complete,
        };
        let json = serde_json::to_value(&envelope).expect("serialize envelope");
        assert_eq!(json["event"], "complete");
        assert_eq!(json["gid"], "2089b05ecca3d829");
    }

    #[test]
    fn only_complete_and_error_are_terminal() {
        let terminal: Vec<_> = LifecycleEvent::ALL
            .into_iter()
            .filter(|event| event.is_terminal())
            .collect();
        assert_eq!(terminal, vec![LifecycleEvent::Complete, LifecycleEvent::Error]);
    }
}
