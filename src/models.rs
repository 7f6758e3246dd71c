#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Broker-supplied timestamp text, passed through verbatim.
    pub timestamp: String,
    pub temperature: MetricReading,
    pub pressure: MetricReading,
    pub humidity: MetricReading,
}

/// One metric field as it arrived on the wire.
///
/// `display` is the payload text shown to the user even when it is not a
/// number; `value` is the numeric coercion, `None` when the field was
/// missing or unparsable (no statistics update for that metric).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub display: String,
    pub value: Option<f64>,
}

impl MetricReading {
    pub fn unavailable() -> Self {
        MetricReading {
            display: "-".to_string(),
            value: None,
        }
    }
}

/// Aggregate statistics over the retained history of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

/// Per-metric statistics snapshot bundled with each delivered sample.
/// A metric is `None` until it has at least one retained value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    pub temperature: Option<MetricStats>,
    pub pressure: Option<MetricStats>,
    pub humidity: Option<MetricStats>,
}

/// Connection lifecycle state of a worker session. Transitions are reported
/// over the notification channel, never polled.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Event delivered from the worker session to the consumer, in emission
/// order over an unbounded channel.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Status {
        state: ConnectionState,
        message: String,
    },
    Data {
        sample: Sample,
        stats: SampleStats,
    },
}
