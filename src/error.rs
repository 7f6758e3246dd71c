use std::time::Duration;

use thiserror::Error;

/// Failures while turning a raw broker payload into a `Sample`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not a UTF-8 JSON object. The message is dropped;
    /// the receive loop continues.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// One metric field could not be coerced to a number. The rest of the
    /// message is still processed; only this metric skips its statistics
    /// update for the cycle.
    #[error("field `{0}` is not numeric")]
    FieldInvalid(&'static str),
}

/// Configuration construction and environment-loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("broker host must not be empty")]
    EmptyHost,

    #[error("broker port must be between 1 and 65535")]
    InvalidPort,

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("{0} environment variable not set")]
    MissingVar(&'static str),
}

/// Lifecycle misuse and shutdown failures of the connection worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is already running")]
    AlreadyRunning,

    #[error("no connection configured")]
    NotConfigured,

    #[error("worker session did not stop within {0:?}")]
    StopTimeout(Duration),
}
