use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// MQTT keep-alive interval sent to the broker.
const KEEP_ALIVE_SECS: u64 = 60;

/// Immutable connection parameters for one worker session.
///
/// A running worker never mutates its configuration; changing broker or
/// topic means stopping the worker and starting a new session with a fresh
/// `ConnectionConfig`.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    topic: String,
    keep_alive: Duration,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16, topic: &str) -> Result<Self, ConfigError> {
        let host = host.trim();
        let topic = topic.trim();

        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }

        Ok(ConnectionConfig {
            host: host.to_string(),
            port,
            topic: topic.to_string(),
            keep_alive: Duration::from_secs(KEEP_ALIVE_SECS),
        })
    }

    /// Load connection parameters from the environment.
    ///
    /// Reads `MONITOR_BROKER_HOST`, `MONITOR_BROKER_PORT` and
    /// `MONITOR_TOPIC`, honoring a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let host = env::var("MONITOR_BROKER_HOST")
            .map_err(|_| ConfigError::MissingVar("MONITOR_BROKER_HOST"))?;
        let port = env::var("MONITOR_BROKER_PORT")
            .map_err(|_| ConfigError::MissingVar("MONITOR_BROKER_PORT"))?
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let topic =
            env::var("MONITOR_TOPIC").map_err(|_| ConfigError::MissingVar("MONITOR_TOPIC"))?;

        ConnectionConfig::new(&host, port, &topic)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_parameters() {
        let config = ConnectionConfig::new("192.168.1.93", 1883, "esp32/env").unwrap();
        assert_eq!(config.host(), "192.168.1.93");
        assert_eq!(config.port(), 1883);
        assert_eq!(config.topic(), "esp32/env");
        assert_eq!(config.keep_alive(), Duration::from_secs(60));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let config = ConnectionConfig::new("  broker.local ", 1883, " esp32/env\n").unwrap();
        assert_eq!(config.host(), "broker.local");
        assert_eq!(config.topic(), "esp32/env");
    }

    #[test]
    fn rejects_empty_host() {
        assert!(matches!(
            ConnectionConfig::new("  ", 1883, "esp32/env"),
            Err(ConfigError::EmptyHost)
        ));
    }

    #[test]
    fn rejects_port_zero() {
        assert!(matches!(
            ConnectionConfig::new("broker.local", 0, "esp32/env"),
            Err(ConfigError::InvalidPort)
        ));
    }

    #[test]
    fn rejects_empty_topic() {
        assert!(matches!(
            ConnectionConfig::new("broker.local", 1883, ""),
            Err(ConfigError::EmptyTopic)
        ));
    }
}
