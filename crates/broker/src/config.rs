//! Broker configuration loaded from environment variables.

use std::time::Duration;

/// Connection and delivery policy for the message broker.
///
/// Reads from environment variables:
/// - `BROKER_URL` — Redis connection URL (default: `"redis://127.0.0.1:6379"`)
/// - `BROKER_STREAM` — shared stream name (default: `"marketplace.events"`)
/// - `BROKER_CONSUMER` — consumer name within a group (default: `"worker-1"`)
/// - `BROKER_MAX_DELIVERIES` — delivery attempts before dead-lettering (default: `5`)
///
/// The backoff settings govern how the consumer's read loop recovers from
/// connection failures: it sleeps `initial_backoff`, doubling up to
/// `max_backoff`, until the stream is readable again.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub stream: String,
    pub consumer_name: String,
    pub max_deliveries: u32,
    pub block_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl BrokerConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("BROKER_URL").unwrap_or(defaults.url),
            stream: std::env::var("BROKER_STREAM").unwrap_or(defaults.stream),
            consumer_name: std::env::var("BROKER_CONSUMER").unwrap_or(defaults.consumer_name),
            max_deliveries: std::env::var("BROKER_MAX_DELIVERIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_deliveries),
            ..defaults
        }
    }

    /// Returns the name of the dead-letter stream.
    pub fn dead_letter_stream(&self) -> String {
        format!("{}:dlq", self.stream)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            stream: "marketplace.events".to_string(),
            consumer_name: "worker-1".to_string(),
            max_deliveries: 5,
            block_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}
