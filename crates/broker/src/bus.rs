//! Broker contract: publish, queue declaration, and consumption.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::envelope::MessageEnvelope;
use crate::error::Result;

/// Messaging backend contract shared by the in-memory and Redis brokers.
///
/// Semantics are at-least-once: a message may be delivered more than once
/// and consumers must tolerate duplicates. Queues are durable: messages
/// published to a declared queue are retained until consumed and acked.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes an envelope, routed by its event name.
    async fn publish(&self, envelope: MessageEnvelope) -> Result<()>;

    /// Declares a durable queue bound to a routing key. Idempotent.
    async fn declare_queue(&self, queue: &str, binding_key: &str) -> Result<()>;

    /// Starts consuming from a previously declared queue.
    async fn consume(&self, queue: &str) -> Result<Subscription>;
}

/// A stream of deliveries from one queue.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Waits for the next delivery.
    ///
    /// Returns `None` once the broker side has shut down.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

/// A single in-flight message handed to a consumer.
///
/// Every delivery must be settled exactly once: [`Delivery::ack`] on
/// success, [`Delivery::nack`] on failure.
pub struct Delivery {
    envelope: MessageEnvelope,
    delivery_count: u32,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub(crate) fn new(
        envelope: MessageEnvelope,
        delivery_count: u32,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            envelope,
            delivery_count,
            acker,
        }
    }

    /// The message being delivered.
    pub fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    /// How many times this message has been delivered, starting at 1.
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Confirms successful processing; the message will not be redelivered.
    pub async fn ack(self) -> Result<()> {
        metrics::counter!("broker_messages_acked_total").increment(1);
        self.acker.ack().await
    }

    /// Reports failed processing.
    ///
    /// The broker requeues the message, or routes it to the dead-letter
    /// destination once the delivery limit is reached.
    pub async fn nack(self) -> Result<()> {
        metrics::counter!("broker_messages_nacked_total").increment(1);
        self.acker.nack().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("envelope", &self.envelope)
            .field("delivery_count", &self.delivery_count)
            .finish_non_exhaustive()
    }
}

/// Backend-specific settlement of one delivery.
#[async_trait]
pub(crate) trait Acknowledger: Send {
    async fn ack(self: Box<Self>) -> Result<()>;
    async fn nack(self: Box<Self>) -> Result<()>;
}
