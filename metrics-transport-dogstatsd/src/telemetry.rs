use std::sync::OnceLock;

use metrics::{counter, Counter};

/// Kind of metric being sent, for telemetry purposes.
#[derive(Clone, Copy)]
pub(crate) enum MetricType {
    Count,
    Gauge,
}

struct Handles {
    metric_points: Counter,
    count_points: Counter,
    gauge_points: Counter,
    packets_sent: Counter,
    packets_dropped: Counter,
    bytes_sent: Counter,
    bytes_dropped: Counter,
}

/// Transport telemetry.
///
/// `Telemetry` tracks how many metrics, packets and bytes the transport sent or dropped, and emits them as normal
/// metrics through whatever recorder is installed.
pub(crate) struct Telemetry {
    transport: &'static str,
    handles: OnceLock<Handles>,
}

impl Telemetry {
    /// Creates a `Telemetry` instance.
    pub fn new(transport: &'static str) -> Self {
        Self { transport, handles: OnceLock::new() }
    }

    // The handles are registered on first use rather than at construction, so that they're attached to the recorder
    // that is installed by the time metrics actually start flowing.
    fn handles(&self) -> &Handles {
        self.handles.get_or_init(|| {
            let transport = self.transport;
            let base_labels = telemetry_tags!("client_transport" => transport);
            let count_labels = telemetry_tags!("client_transport" => transport, "metrics_type" => "count");
            let gauge_labels = telemetry_tags!("client_transport" => transport, "metrics_type" => "gauge");

            Handles {
                metric_points: counter!("datadog.dogstatsd.client.metrics", base_labels.iter()),
                count_points: counter!("datadog.dogstatsd.client.metrics_by_type", count_labels.iter()),
                gauge_points: counter!("datadog.dogstatsd.client.metrics_by_type", gauge_labels.iter()),
                packets_sent: counter!("datadog.dogstatsd.client.packets_sent", base_labels.iter()),
                packets_dropped: counter!("datadog.dogstatsd.client.packets_dropped", base_labels.iter()),
                bytes_sent: counter!("datadog.dogstatsd.client.bytes_sent", base_labels.iter()),
                bytes_dropped: counter!("datadog.dogstatsd.client.bytes_dropped", base_labels.iter()),
            }
        })
    }

    /// Tracks a metric being written.
    pub fn track_metric(&self, metric_type: MetricType) {
        let handles = self.handles();
        handles.metric_points.increment(1);
        match metric_type {
            MetricType::Count => handles.count_points.increment(1),
            MetricType::Gauge => handles.gauge_points.increment(1),
        }
    }

    /// Tracks a successful packet send.
    pub fn track_packet_sent(&self, bytes_len: usize) {
        let handles = self.handles();
        handles.packets_sent.increment(1);
        handles.bytes_sent.increment(bytes_len as u64);
    }

    /// Tracks a packet that was dropped for any reason.
    pub fn track_packet_dropped(&self) {
        self.handles().packets_dropped.increment(1);
    }

    /// Tracks the bytes of a packet that was written but could not be sent.
    pub fn track_bytes_dropped(&self, bytes_len: usize) {
        self.handles().bytes_dropped.increment(bytes_len as u64);
    }
}

macro_rules! _telemetry_tags {
    ($($k:literal => $v:expr),*) => {
        [
            ::metrics::Label::from_static_parts("client", "rust"),
            ::metrics::Label::from_static_parts("client_version", env!("CARGO_PKG_VERSION")),
            $(::metrics::Label::from_static_parts($k, $v),)*
        ]
    };
}

pub(crate) use _telemetry_tags as telemetry_tags;
