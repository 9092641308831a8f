//! Messaging layer connecting the marketplace services.
//!
//! Domain events travel over a shared topic stream: publishers route each
//! message by the event's dot-namespaced name, consumers bind durable
//! queues to routing keys and settle every delivery with an explicit
//! ack or nack.
//!
//! Delivery is at-least-once. A message may arrive more than once, so
//! handlers must be idempotent. A nacked message is requeued until its
//! delivery count reaches the configured limit, after which it is routed
//! to the dead-letter destination instead of being lost.

pub mod bus;
pub mod config;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod redis_streams;
pub mod routing;

pub use bus::{Delivery, MessageBroker, Subscription};
pub use config::BrokerConfig;
pub use envelope::MessageEnvelope;
pub use error::{BrokerError, Result};
pub use memory::InMemoryBroker;
pub use redis_streams::RedisStreamsBroker;
