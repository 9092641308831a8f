//! Consumer worker for shipped-order events.

use broker::{BrokerError, Delivery, MessageBroker, MessageEnvelope};
use domain::OrderShippedData;
use thiserror::Error;

use crate::publish;
use crate::repository::InvoiceRepository;
use crate::service::{InvoiceService, ServiceError};

/// Durable queue bound to the order service's shipped events.
pub const ORDER_SHIPPED_QUEUE: &str = "invoice-service.order-shipped";

/// Routing key the queue is bound to.
pub const ORDER_SHIPPED_KEY: &str = "order.shipped";

#[derive(Debug, Error)]
enum ConsumeError {
    #[error("Malformed event payload: {0}")]
    Payload(#[from] BrokerError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Consumes `order.shipped` events and triggers the invoice send.
///
/// Messages are handled one at a time in arrival order. A failure —
/// malformed payload, missing invoice, storage error — is negatively
/// acknowledged; the broker then redelivers the message up to its
/// delivery limit and dead-letters it afterwards, so a transient outage
/// does not silently lose the event. Duplicate deliveries are absorbed
/// by the idempotent send use case, not by locking.
pub struct OrderShippedConsumer<B, R> {
    broker: B,
    invoices: InvoiceService<R>,
}

impl<B, R> OrderShippedConsumer<B, R>
where
    B: MessageBroker,
    R: InvoiceRepository,
{
    /// Creates a new consumer over the given broker and invoice service.
    pub fn new(broker: B, invoices: InvoiceService<R>) -> Self {
        Self { broker, invoices }
    }

    /// Declares the queue binding and processes deliveries until the
    /// subscription closes.
    pub async fn run(&self) -> Result<(), BrokerError> {
        self.broker
            .declare_queue(ORDER_SHIPPED_QUEUE, ORDER_SHIPPED_KEY)
            .await?;
        let mut subscription = self.broker.consume(ORDER_SHIPPED_QUEUE).await?;

        tracing::info!(
            queue = ORDER_SHIPPED_QUEUE,
            routing_key = ORDER_SHIPPED_KEY,
            "consumer started"
        );

        while let Some(delivery) = subscription.next().await {
            self.process(delivery).await?;
        }

        tracing::info!(queue = ORDER_SHIPPED_QUEUE, "consumer stopped");
        Ok(())
    }

    async fn process(&self, delivery: Delivery) -> Result<(), BrokerError> {
        metrics::counter!("consumer_messages_received_total").increment(1);

        match self.handle(delivery.envelope()).await {
            Ok(()) => delivery.ack().await,
            Err(e) => {
                metrics::counter!("consumer_messages_failed_total").increment(1);
                tracing::error!(
                    routing_key = %delivery.envelope().routing_key(),
                    deliveries = delivery.delivery_count(),
                    error = %e,
                    "failed to process shipped-order event"
                );
                delivery.nack().await
            }
        }
    }

    async fn handle(&self, envelope: &MessageEnvelope) -> Result<(), ConsumeError> {
        let event: OrderShippedData = envelope.payload_as()?;
        let order_id = event.aggregate_id.to_string();

        tracing::info!(order_id = %order_id, "received shipped-order event");

        let mut invoice = self.invoices.send_invoice(&order_id).await?;
        publish::publish_events(&self.broker, invoice.take_domain_events()).await;

        tracing::info!(order_id = %order_id, invoice_id = %invoice.id(), "invoice send processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::repository::InMemoryInvoiceRepository;
    use broker::{InMemoryBroker, MessageEnvelope};
    use common::OrderId;
    use domain::{OrderEvent, SellerId};

    fn shipped_envelope(order_id: OrderId) -> MessageEnvelope {
        let event = OrderEvent::shipped(order_id, SellerId::new("seller-1"));
        MessageEnvelope::from_event("order.shipped", &event).unwrap()
    }

    async fn wait_for_sent(repository: &InMemoryInvoiceRepository, order_id: &str) {
        let service = InvoiceService::new(repository.clone());
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(invoice) = service.get_invoice(order_id).await
                    && invoice.is_sent()
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("invoice was not sent in time");
    }

    #[tokio::test]
    async fn test_shipped_event_sends_invoice() {
        let broker = InMemoryBroker::new();
        let repository = InMemoryInvoiceRepository::new();

        let order_id = OrderId::new();
        let invoices = InvoiceService::new(repository.clone());
        invoices
            .upload_invoice(&order_id.to_string(), "/uploads/invoice.pdf")
            .await
            .unwrap();

        // Declare the binding up front so the publish below is retained;
        // the consumer's own declaration is an idempotent no-op.
        broker
            .declare_queue(ORDER_SHIPPED_QUEUE, ORDER_SHIPPED_KEY)
            .await
            .unwrap();

        let consumer =
            OrderShippedConsumer::new(broker.clone(), InvoiceService::new(repository.clone()));
        let worker = tokio::spawn(async move { consumer.run().await });

        broker.publish(shipped_envelope(order_id)).await.unwrap();

        wait_for_sent(&repository, &order_id.to_string()).await;
        worker.abort();
    }

    #[tokio::test]
    async fn test_missing_invoice_is_nacked_to_dead_letters() {
        let broker = InMemoryBroker::with_max_deliveries(3);
        let repository = InMemoryInvoiceRepository::new();

        broker
            .declare_queue(ORDER_SHIPPED_QUEUE, ORDER_SHIPPED_KEY)
            .await
            .unwrap();

        let consumer =
            OrderShippedConsumer::new(broker.clone(), InvoiceService::new(repository.clone()));
        let worker = tokio::spawn(async move { consumer.run().await });

        // No invoice was ever uploaded for this order.
        broker.publish(shipped_envelope(OrderId::new())).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if broker.dead_letter_count().await == 1 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("message was not dead-lettered in time");

        let dead = broker.dead_letters().await;
        assert_eq!(dead[0].delivery_count, 3);
        worker.abort();
    }
}
