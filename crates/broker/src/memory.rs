//! In-memory broker for tests and single-process development.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::bus::{Acknowledger, Delivery, MessageBroker, Subscription};
use crate::envelope::MessageEnvelope;
use crate::error::{BrokerError, Result};
use crate::routing;

const DEFAULT_MAX_DELIVERIES: u32 = 5;

/// In-memory broker implementation.
///
/// Provides the same contract as the Redis backend: topic-pattern queue
/// bindings, at-least-once delivery with per-message delivery counts, and
/// a dead-letter store for messages that exhaust the delivery limit. The
/// dead-letter store is inspectable, which the integration tests rely on.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    max_deliveries: u32,
    queues: RwLock<HashMap<String, Queue>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
}

struct Queue {
    binding_key: String,
    sender: mpsc::UnboundedSender<Delivery>,
    // Present until `consume` claims it.
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

/// A message that exhausted its delivery limit.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The queue the message was being delivered to.
    pub queue: String,
    /// The undeliverable message.
    pub envelope: MessageEnvelope,
    /// The delivery count at the time it was dead-lettered.
    pub delivery_count: u32,
}

impl InMemoryBroker {
    /// Creates a new broker with the default delivery limit.
    pub fn new() -> Self {
        Self::with_max_deliveries(DEFAULT_MAX_DELIVERIES)
    }

    /// Creates a new broker with a custom delivery limit.
    pub fn with_max_deliveries(max_deliveries: u32) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                max_deliveries,
                queues: RwLock::new(HashMap::new()),
                dead_letters: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Returns the number of dead-lettered messages.
    pub async fn dead_letter_count(&self) -> usize {
        self.inner.dead_letters.read().await.len()
    }

    /// Returns a copy of the dead-lettered messages.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead_letters.read().await.clone()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerInner {
    fn enqueue(
        inner: &Arc<Self>,
        queue_name: &str,
        queue: &Queue,
        envelope: MessageEnvelope,
        delivery_count: u32,
    ) {
        let acker = MemoryAcker {
            inner: Arc::downgrade(inner),
            queue: queue_name.to_string(),
            envelope: envelope.clone(),
            delivery_count,
        };
        let delivery = Delivery::new(envelope, delivery_count, Box::new(acker));
        if queue.sender.send(delivery).is_err() {
            tracing::warn!(queue = queue_name, "dropping message for closed subscription");
        }
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, envelope: MessageEnvelope) -> Result<()> {
        let queues = self.inner.queues.read().await;
        for (name, queue) in queues.iter() {
            if routing::matches(&queue.binding_key, envelope.routing_key()) {
                BrokerInner::enqueue(&self.inner, name, queue, envelope.clone(), 1);
            }
        }
        metrics::counter!("broker_messages_published_total").increment(1);
        Ok(())
    }

    async fn declare_queue(&self, queue: &str, binding_key: &str) -> Result<()> {
        let mut queues = self.inner.queues.write().await;
        if queues.contains_key(queue) {
            return Ok(());
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        queues.insert(
            queue.to_string(),
            Queue {
                binding_key: binding_key.to_string(),
                sender,
                receiver: Some(receiver),
            },
        );
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Subscription> {
        let mut queues = self.inner.queues.write().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;
        let receiver = state
            .receiver
            .take()
            .ok_or_else(|| BrokerError::Consume(format!("queue {queue} is already consumed")))?;
        Ok(Subscription::new(receiver))
    }
}

struct MemoryAcker {
    inner: Weak<BrokerInner>,
    queue: String,
    envelope: MessageEnvelope,
    delivery_count: u32,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        let Some(inner) = self.inner.upgrade() else {
            return Ok(());
        };

        if self.delivery_count >= inner.max_deliveries {
            inner.dead_letters.write().await.push(DeadLetter {
                queue: self.queue,
                envelope: self.envelope,
                delivery_count: self.delivery_count,
            });
            metrics::counter!("broker_messages_dead_lettered_total").increment(1);
        } else {
            let queues = inner.queues.read().await;
            if let Some(queue) = queues.get(&self.queue) {
                BrokerInner::enqueue(&inner, &self.queue, queue, self.envelope, self.delivery_count + 1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(event_name: &str) -> MessageEnvelope {
        MessageEnvelope::from_event(event_name, &serde_json::json!({"aggregateId": "order-1"}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_routes_to_bound_queue() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();

        broker.publish(envelope("order.shipped")).await.unwrap();

        let mut subscription = broker.consume("q1").await.unwrap();
        let delivery = subscription.next().await.unwrap();
        assert_eq!(delivery.envelope().routing_key(), "order.shipped");
        assert_eq!(delivery.delivery_count(), 1);
        delivery.ack().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_skips_unbound_routing_keys() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();

        broker.publish(envelope("order.created")).await.unwrap();
        broker.publish(envelope("order.shipped")).await.unwrap();

        let mut subscription = broker.consume("q1").await.unwrap();
        let delivery = subscription.next().await.unwrap();
        assert_eq!(delivery.envelope().routing_key(), "order.shipped");
    }

    #[tokio::test]
    async fn test_wildcard_binding_receives_all_order_events() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("audit", "order.#").await.unwrap();

        broker.publish(envelope("order.created")).await.unwrap();
        broker.publish(envelope("order.status.changed")).await.unwrap();
        broker.publish(envelope("invoice.sent")).await.unwrap();

        let mut subscription = broker.consume("audit").await.unwrap();
        let first = subscription.next().await.unwrap();
        let second = subscription.next().await.unwrap();
        assert_eq!(first.envelope().routing_key(), "order.created");
        assert_eq!(second.envelope().routing_key(), "order.status.changed");
    }

    #[tokio::test]
    async fn test_messages_published_before_consume_are_retained() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();
        broker.publish(envelope("order.shipped")).await.unwrap();

        // Consumer attaches after the publish.
        let mut subscription = broker.consume("q1").await.unwrap();
        assert!(subscription.next().await.is_some());
    }

    #[tokio::test]
    async fn test_nack_redelivers_with_incremented_count() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();
        broker.publish(envelope("order.shipped")).await.unwrap();

        let mut subscription = broker.consume("q1").await.unwrap();
        let delivery = subscription.next().await.unwrap();
        assert_eq!(delivery.delivery_count(), 1);
        delivery.nack().await.unwrap();

        let redelivery = subscription.next().await.unwrap();
        assert_eq!(redelivery.delivery_count(), 2);
        redelivery.ack().await.unwrap();

        assert_eq!(broker.dead_letter_count().await, 0);
    }

    #[tokio::test]
    async fn test_exhausted_deliveries_go_to_dead_letter_store() {
        let broker = InMemoryBroker::with_max_deliveries(3);
        broker.declare_queue("q1", "order.shipped").await.unwrap();
        broker.publish(envelope("order.shipped")).await.unwrap();

        let mut subscription = broker.consume("q1").await.unwrap();
        for _ in 0..3 {
            let delivery = subscription.next().await.unwrap();
            delivery.nack().await.unwrap();
        }

        assert_eq!(broker.dead_letter_count().await, 1);
        let dead = broker.dead_letters().await;
        assert_eq!(dead[0].queue, "q1");
        assert_eq!(dead[0].delivery_count, 3);
        assert_eq!(dead[0].envelope.routing_key(), "order.shipped");
    }

    #[tokio::test]
    async fn test_consume_requires_declared_queue() {
        let broker = InMemoryBroker::new();
        let result = broker.consume("missing").await;
        assert!(matches!(result, Err(BrokerError::QueueNotDeclared(_))));
    }

    #[tokio::test]
    async fn test_declare_queue_is_idempotent() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();
        broker.declare_queue("q1", "order.shipped").await.unwrap();

        broker.publish(envelope("order.shipped")).await.unwrap();
        let mut subscription = broker.consume("q1").await.unwrap();
        assert!(subscription.next().await.is_some());
    }

    #[tokio::test]
    async fn test_two_queues_both_receive_a_copy() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q1", "order.shipped").await.unwrap();
        broker.declare_queue("q2", "order.shipped").await.unwrap();

        broker.publish(envelope("order.shipped")).await.unwrap();

        let mut s1 = broker.consume("q1").await.unwrap();
        let mut s2 = broker.consume("q2").await.unwrap();
        assert!(s1.next().await.is_some());
        assert!(s2.next().await.is_some());
    }
}
