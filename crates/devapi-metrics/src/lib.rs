//! Metrics for the device native API server.
//!
//! Every metric the server records is declared once as a [`Metric`] constant
//! in [`metric_defs`], so names cannot drift between the recording site and
//! [`describe_metrics`]. The `metrics` crate is re-exported for the macros.
//!
//! # Example
//!
//! ```rust
//! use devapi_metrics::{metric_defs, MessageLabels};
//!
//! let labels = MessageLabels::new("HelloRequest");
//! devapi_metrics::metrics::counter!(metric_defs::FRAMES_RECEIVED.name, &labels.to_labels())
//!     .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing.
    Counter,
    /// Goes up and down.
    Gauge,
    /// Distribution of observed values.
    Histogram,
}

impl MetricKind {
    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use devapi_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const DROPPED: Metric = Metric::counter("devapi.example.dropped")
///     .with_description("Frames dropped")
///     .with_unit(Unit::Count)
///     .with_labels(&["message_type"]);
///
/// assert_eq!(DROPPED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, e.g. `devapi.api.frames_sent`.
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Label keys recorded with this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// Every metric the API server records.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Label Keys
    // ========================================================================

    /// Labels on per-message metrics.
    pub const MESSAGE_LABELS: &[&str] = &["message_type"];

    // ========================================================================
    // Connections
    // ========================================================================

    /// Connections handed to the server.
    pub const CONNECTIONS_ACCEPTED: Metric = Metric::counter("devapi.api.connections_accepted")
        .with_description("Client connections accepted")
        .with_unit(Unit::Count);

    /// Connections removed by the server tick, for any reason.
    pub const CONNECTIONS_CLOSED: Metric = Metric::counter("devapi.api.connections_closed")
        .with_description("Client connections closed and removed")
        .with_unit(Unit::Count);

    /// Connections currently held by the server.
    pub const ACTIVE_CONNECTIONS: Metric = Metric::gauge("devapi.api.active_connections")
        .with_description("Client connections currently open")
        .with_unit(Unit::Count);

    /// Connections closed because of a protocol violation.
    ///
    /// Labels: reason
    pub const FATAL_ERRORS: Metric = Metric::counter("devapi.api.fatal_errors")
        .with_description("Connections closed after a protocol violation")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    // ========================================================================
    // Frames
    // ========================================================================

    /// Frames decoded and dispatched.
    ///
    /// Labels: message_type
    pub const FRAMES_RECEIVED: Metric = Metric::counter("devapi.api.frames_received")
        .with_description("Frames received and dispatched")
        .with_unit(Unit::Count)
        .with_labels(MESSAGE_LABELS);

    /// Frames handed to the transport.
    ///
    /// Labels: message_type
    pub const FRAMES_SENT: Metric = Metric::counter("devapi.api.frames_sent")
        .with_description("Frames written to the transport")
        .with_unit(Unit::Count)
        .with_labels(MESSAGE_LABELS);

    /// Frames dropped because the transport had no room.
    ///
    /// Labels: message_type
    pub const SEND_DROPPED: Metric = Metric::counter("devapi.api.send_dropped")
        .with_description("Frames dropped for lack of transport buffer space")
        .with_unit(Unit::Count)
        .with_labels(MESSAGE_LABELS);

    /// Payload size of frames handed to the transport.
    pub const FRAME_PAYLOAD_SIZE: Metric = Metric::histogram("devapi.api.frame_payload_bytes")
        .with_description("Payload size of sent frames")
        .with_unit(Unit::Bytes);

    /// All metrics, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &CONNECTIONS_ACCEPTED,
        &CONNECTIONS_CLOSED,
        &ACTIVE_CONNECTIONS,
        &FATAL_ERRORS,
        &FRAMES_RECEIVED,
        &FRAMES_SENT,
        &SEND_DROPPED,
        &FRAME_PAYLOAD_SIZE,
    ];
}

/// Labels for per-message metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLabels {
    pub message_type: String,
}

impl MessageLabels {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
        }
    }

    /// Label pairs in the form the `metrics` macros accept.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("message_type", self.message_type.clone())]
    }
}

/// Register descriptions for every metric in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a Prometheus recorder serving `/metrics` on `addr`.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
}
