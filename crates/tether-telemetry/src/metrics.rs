//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts engine commands by outcome and lifecycle events by delivery result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label recorded for an engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The engine accepted the command.
    Accepted,
    /// The engine refused a state transition without failing.
    Refused,
    /// The engine reported a failure.
    Failed,
}

impl CommandOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Refused => "refused",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry shared by controllers.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    engine_commands_total: IntCounterVec,
    events_dispatched_total: IntCounterVec,
    events_dropped_total: IntCounterVec,
    dispatched: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of event delivery counters for health reporting.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Events handed to a notification sink.
    pub events_dispatched_total: u64,
    /// Events dropped before reaching a sink.
    pub events_dropped_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let engine_commands_total = counter_vec(
            "engine_commands_total",
            "Commands issued to the download engine by outcome",
            &["operation", "outcome"],
        )?;
        let events_dispatched_total = counter_vec(
            "events_dispatched_total",
            "Lifecycle events delivered to the notification sink",
            &["kind"],
        )?;
        let events_dropped_total = counter_vec(
            "events_dropped_total",
            "Lifecycle events dropped before reaching a sink",
            &["reason"],
        )?;

        register(&registry, "engine_commands_total", &engine_commands_total)?;
        register(&registry, "events_dispatched_total", &events_dispatched_total)?;
        register(&registry, "events_dropped_total", &events_dropped_total)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                engine_commands_total,
                events_dispatched_total,
                events_dropped_total,
                dispatched: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        })
    }

    /// Record the outcome of an engine command.
    pub fn record_command(&self, operation: &str, outcome: CommandOutcome) {
        self.inner
            .engine_commands_total
            .with_label_values(&[operation, outcome.label()])
            .inc();
    }

    /// Record a lifecycle event delivered to a sink.
    pub fn record_dispatched(&self, kind: &str) {
        self.inner
            .events_dispatched_total
            .with_label_values(&[kind])
            .inc();
        self.inner.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lifecycle event dropped before delivery.
    pub fn record_dropped(&self, reason: &str) {
        self.inner
            .events_dropped_total
            .with_label_values(&[reason])
            .inc();
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count of commands recorded for `operation` with `outcome`.
    #[must_use]
    pub fn command_count(&self, operation: &str, outcome: CommandOutcome) -> u64 {
        self.inner
            .engine_commands_total
            .with_label_values(&[operation, outcome.label()])
            .get()
    }

    /// Totals across every label of the event counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_dispatched_total: self.inner.dispatched.load(Ordering::Relaxed),
            events_dropped_total: self.inner.dropped.load(Ordering::Relaxed),
        }
    }

    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register(registry: &Registry, name: &'static str, collector: &IntCounterVec) -> Result<()> {
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
