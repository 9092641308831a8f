use thiserror::Error;

/// Errors that can occur when interacting with the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker connection could not be established or was lost.
    #[error("Broker connection error: {0}")]
    Connection(String),

    /// A message could not be published.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// A queue could not be declared or consumed from.
    #[error("Consume failed: {0}")]
    Consume(String),

    /// The queue was never declared on this broker.
    #[error("Queue not declared: {0}")]
    QueueNotDeclared(String),

    /// A message body could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
