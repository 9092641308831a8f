//! Redis Streams broker backend (durable, at-least-once delivery).
//!
//! Every event is appended to one shared stream; each queue is a consumer
//! group on that stream with its own cursor, so a queue keeps receiving
//! messages published while its consumer was down. Entries whose routing
//! key does not match the queue's binding are acked immediately.
//!
//! A nack republishes the entry with an incremented delivery count and
//! acks the original; once the count reaches `max_deliveries` the entry
//! goes to the `<stream>:dlq` stream instead. Republishing re-enters the
//! shared stream, so other groups may see the entry again — consumers
//! must be idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use tokio::sync::{RwLock, mpsc};

use crate::bus::{Acknowledger, Delivery, MessageBroker, Subscription};
use crate::config::BrokerConfig;
use crate::envelope::MessageEnvelope;
use crate::error::{BrokerError, Result};
use crate::routing;

const FIELD_ROUTING_KEY: &str = "routingKey";
const FIELD_DELIVERY_COUNT: &str = "deliveryCount";
const FIELD_PAYLOAD: &str = "payload";

/// Redis Streams broker implementation.
#[derive(Clone)]
pub struct RedisStreamsBroker {
    inner: Arc<RedisInner>,
}

struct RedisInner {
    connection: MultiplexedConnection,
    config: BrokerConfig,
    bindings: RwLock<HashMap<String, String>>,
}

impl RedisStreamsBroker {
    /// Connects to Redis and keeps one multiplexed connection for the
    /// broker's lifetime. Reconnection is handled by the connection
    /// itself; the consumer read loop additionally backs off between
    /// failed reads per the config's backoff policy.
    pub async fn connect(config: BrokerConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        tracing::info!(stream = %config.stream, "connected to redis broker");

        Ok(Self {
            inner: Arc::new(RedisInner {
                connection,
                config,
                bindings: RwLock::new(HashMap::new()),
            }),
        })
    }
}

#[async_trait]
impl MessageBroker for RedisStreamsBroker {
    async fn publish(&self, envelope: MessageEnvelope) -> Result<()> {
        let stream = self.inner.config.stream.clone();
        self.inner.append(&stream, &envelope, 1).await?;
        metrics::counter!("broker_messages_published_total").increment(1);
        Ok(())
    }

    async fn declare_queue(&self, queue: &str, binding_key: &str) -> Result<()> {
        let mut conn = self.inner.connection.clone();
        let created: std::result::Result<String, redis::RedisError> = conn
            .xgroup_create_mkstream(self.inner.config.stream.as_str(), queue, "0")
            .await;

        if let Err(e) = created {
            // BUSYGROUP means the group already exists, which is fine.
            if !e.to_string().contains("BUSYGROUP") {
                return Err(BrokerError::Consume(e.to_string()));
            }
        }

        self.inner
            .bindings
            .write()
            .await
            .insert(queue.to_string(), binding_key.to_string());
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Subscription> {
        let binding = self
            .inner
            .bindings
            .read()
            .await
            .get(queue)
            .cloned()
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let inner = self.inner.clone();
        let queue = queue.to_string();
        tokio::spawn(async move {
            inner.read_loop(queue, binding, sender).await;
        });

        Ok(Subscription::new(receiver))
    }
}

impl RedisInner {
    /// Appends an envelope to a stream.
    async fn append(&self, stream: &str, envelope: &MessageEnvelope, delivery_count: u32) -> Result<()> {
        let payload = serde_json::to_string(envelope)?;
        let mut conn = self.connection.clone();
        let _: String = conn
            .xadd(
                stream,
                "*",
                &[
                    (FIELD_ROUTING_KEY, envelope.routing_key().to_string()),
                    (FIELD_DELIVERY_COUNT, delivery_count.to_string()),
                    (FIELD_PAYLOAD, payload),
                ],
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    /// Acknowledges one stream entry for a consumer group.
    async fn ack_entry(&self, group: &str, entry_id: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn
            .xack(self.config.stream.as_str(), group, &[entry_id])
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;
        Ok(())
    }

    /// Blocking read loop forwarding matching entries to the subscription.
    async fn read_loop(
        self: Arc<Self>,
        queue: String,
        binding: String,
        sender: mpsc::UnboundedSender<Delivery>,
    ) {
        let mut backoff = self.config.initial_backoff;
        loop {
            if sender.is_closed() {
                tracing::debug!(queue = %queue, "subscription dropped, stopping read loop");
                return;
            }

            let options = StreamReadOptions::default()
                .group(&queue, &self.config.consumer_name)
                .count(16)
                .block(self.config.block_timeout.as_millis() as usize);

            let mut conn = self.connection.clone();
            let reply: std::result::Result<StreamReadReply, redis::RedisError> = conn
                .xread_options(&[self.config.stream.as_str()], &[">"], &options)
                .await;

            match reply {
                Ok(reply) => {
                    backoff = self.config.initial_backoff;
                    for key in reply.keys {
                        for entry in key.ids {
                            Self::dispatch(&self, &queue, &binding, entry, &sender).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        queue = %queue,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "stream read failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }
    }

    /// Turns one stream entry into a delivery, or settles it in place.
    async fn dispatch(
        inner: &Arc<Self>,
        queue: &str,
        binding: &str,
        entry: StreamId,
        sender: &mpsc::UnboundedSender<Delivery>,
    ) {
        let routing_key: String = entry.get(FIELD_ROUTING_KEY).unwrap_or_default();

        if !routing::matches(binding, &routing_key) {
            // The shared stream carries every event; entries outside this
            // queue's binding are settled immediately.
            if let Err(e) = inner.ack_entry(queue, &entry.id).await {
                tracing::warn!(queue = %queue, error = %e, "failed to ack unbound entry");
            }
            return;
        }

        let delivery_count: u32 = entry
            .get::<String>(FIELD_DELIVERY_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        let envelope = entry
            .get::<String>(FIELD_PAYLOAD)
            .and_then(|payload| serde_json::from_str::<MessageEnvelope>(&payload).ok());

        let Some(envelope) = envelope else {
            tracing::error!(queue = %queue, entry_id = %entry.id, "dead-lettering malformed stream entry");
            metrics::counter!("broker_messages_dead_lettered_total").increment(1);
            if let Err(e) = inner.quarantine_raw(&entry).await {
                tracing::warn!(error = %e, "failed to move malformed entry to dead-letter stream");
            }
            if let Err(e) = inner.ack_entry(queue, &entry.id).await {
                tracing::warn!(queue = %queue, error = %e, "failed to ack malformed entry");
            }
            return;
        };

        let acker = RedisAcker {
            inner: inner.clone(),
            queue: queue.to_string(),
            entry_id: entry.id.clone(),
            envelope: envelope.clone(),
            delivery_count,
        };
        if sender
            .send(Delivery::new(envelope, delivery_count, Box::new(acker)))
            .is_err()
        {
            tracing::debug!(queue = %queue, "subscription dropped mid-dispatch");
        }
    }

    /// Copies a malformed entry's raw fields to the dead-letter stream.
    async fn quarantine_raw(&self, entry: &StreamId) -> Result<()> {
        let routing_key: String = entry.get(FIELD_ROUTING_KEY).unwrap_or_default();
        let payload: String = entry.get(FIELD_PAYLOAD).unwrap_or_default();
        let mut conn = self.connection.clone();
        let _: String = conn
            .xadd(
                self.config.dead_letter_stream().as_str(),
                "*",
                &[
                    (FIELD_ROUTING_KEY, routing_key),
                    (FIELD_PAYLOAD, payload),
                ],
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }
}

struct RedisAcker {
    inner: Arc<RedisInner>,
    queue: String,
    entry_id: String,
    envelope: MessageEnvelope,
    delivery_count: u32,
}

#[async_trait]
impl Acknowledger for RedisAcker {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.inner.ack_entry(&self.queue, &self.entry_id).await
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        if self.delivery_count >= self.inner.config.max_deliveries {
            let dlq = self.inner.config.dead_letter_stream();
            self.inner
                .append(&dlq, &self.envelope, self.delivery_count)
                .await?;
            metrics::counter!("broker_messages_dead_lettered_total").increment(1);
            tracing::warn!(
                queue = %self.queue,
                routing_key = %self.envelope.routing_key(),
                deliveries = self.delivery_count,
                "message exhausted delivery limit, dead-lettered"
            );
        } else {
            let stream = self.inner.config.stream.clone();
            self.inner
                .append(&stream, &self.envelope, self.delivery_count + 1)
                .await?;
        }
        self.inner.ack_entry(&self.queue, &self.entry_id).await
    }
}
