//! Error taxonomy for session controller operations.
//!
//! Messages stay constant; the operational context lives in the variant fields
//! so logs and callers can inspect it without parsing strings.

use thiserror::Error;

/// Scope an option mutation was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// Options attached to a single session.
    Session,
    /// Engine-wide options.
    Global,
}

/// Primary error type for session controller operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// A session identifier was not valid base-16.
    #[error("invalid session identifier")]
    InvalidFormat {
        /// Offending input.
        value: String,
    },
    /// The engine refused to register a new session.
    #[error("engine rejected download")]
    AddFailed {
        /// Operation that was refused (`add_uri` or `add_torrent`).
        operation: &'static str,
        /// URI or torrent path that was submitted.
        target: String,
    },
    /// A torrent file could not be read or was not a valid torrent.
    #[error("torrent parse failed")]
    ParseFailed {
        /// Path handed to the engine.
        path: String,
    },
    /// The engine rejected an option mutation.
    #[error("option change rejected")]
    OptionChangeFailed {
        /// Whether the change targeted one session or the engine.
        scope: OptionScope,
        /// Session identifier for session-scoped changes.
        gid: Option<String>,
    },
    /// Transfer metadata did not become available within the retry cap.
    #[error("timed out waiting for transfer metadata")]
    MetadataTimeout {
        /// Session identifier that was polled.
        gid: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// An option wire string or option set could not be encoded or decoded.
    #[error("malformed option set")]
    MalformedOptions {
        /// Static reason describing the defect.
        reason: &'static str,
    },
    /// The engine returned no option set for a session.
    #[error("session options unavailable")]
    OptionsUnavailable {
        /// Session identifier that was queried.
        gid: String,
    },
    /// The engine failed to initialise its session.
    #[error("engine initialisation failed")]
    EngineInit {
        /// Non-zero code returned by the engine.
        code: i32,
    },
    /// The engine failed to finalise its session.
    #[error("engine shutdown failed")]
    EngineShutdown {
        /// Non-zero code returned by the engine.
        code: i32,
    },
    /// The engine reported a status code outside the known enumeration.
    #[error("unknown download status")]
    UnknownStatus {
        /// Raw status code reported by the engine.
        code: i32,
    },
}

/// Convenience alias for controller results.
pub type ControllerResult<T> = Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_constant() {
        let cases = vec![
            (
                ControllerError::InvalidFormat {
                    value: "zz".to_string(),
                },
                "invalid session identifier",
            ),
            (
                ControllerError::AddFailed {
                    operation: "add_uri",
                    target: "ftp://bad".to_string(),
                },
                "engine rejected download",
            ),
            (
                ControllerError::ParseFailed {
                    path: "broken.torrent".to_string(),
                },
                "torrent parse failed",
            ),
            (
                ControllerError::OptionChangeFailed {
                    scope: OptionScope::Global,
                    gid: None,
                },
                "option change rejected",
            ),
            (
                ControllerError::MetadataTimeout {
                    gid: "1".to_string(),
                    attempts: 60,
                },
                "timed out waiting for transfer metadata",
            ),
            (
                ControllerError::UnknownStatus { code: 9 },
                "unknown download status",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
        }
    }
}
