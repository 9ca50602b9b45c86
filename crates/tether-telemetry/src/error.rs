//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Building a Prometheus collector failed.
    MetricsCollector {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Registering a Prometheus collector failed.
    MetricsRegister {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Encoding Prometheus metrics failed.
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Rendered metrics output was not valid UTF-8.
    MetricsUtf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => formatter.write_str("tracing subscriber install failed"),
            Self::MetricsCollector { .. } => formatter.write_str("metrics collector build failed"),
            Self::MetricsRegister { .. } => {
                formatter.write_str("metrics collector registration failed")
            }
            Self::MetricsEncode { .. } => formatter.write_str("metrics encoding failed"),
            Self::MetricsUtf8 { .. } => formatter.write_str("metrics output was not utf-8"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::MetricsCollector { source, .. }
            | Self::MetricsRegister { source, .. }
            | Self::MetricsEncode { source } => Some(source),
            Self::MetricsUtf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_constant_and_source_is_kept() {
        let err = TelemetryError::MetricsEncode {
            source: PrometheusError::Msg("boom".to_string()),
        };
        assert_eq!(err.to_string(), "metrics encoding failed");
        assert!(err.source().is_some());

        let err = TelemetryError::MetricsRegister {
            name: "events_dispatched_total",
            source: PrometheusError::AlreadyReg,
        };
        assert_eq!(err.to_string(), "metrics collector registration failed");

        let err = TelemetryError::MetricsCollector {
            name: "engine_commands_total",
            source: PrometheusError::Msg("bad label".to_string()),
        };
        assert_eq!(err.to_string(), "metrics collector build failed");
    }
}
