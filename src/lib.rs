pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod mqtt;
pub mod stats;

pub use config::ConnectionConfig;
pub use error::{ConfigError, DecodeError, WorkerError};
pub use models::{ConnectionState, MetricReading, MetricStats, Sample, SampleStats, WorkerEvent};
pub use mqtt::ConnectionWorker;
pub use stats::{MetricHistories, RollingStatistics, MAX_HISTORY};
