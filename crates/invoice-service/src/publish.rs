//! Domain-event publishing glue.

use broker::{MessageBroker, MessageEnvelope};
use domain::{DomainEvent, InvoiceEvent};

/// Publishes drained invoice events to the shared stream.
///
/// Called after the repository write has committed; a failed publish is
/// logged and counted, not retried.
pub async fn publish_events<B: MessageBroker>(broker: &B, events: Vec<InvoiceEvent>) {
    for event in events {
        let event_name = event.event_name();
        let envelope = match MessageEnvelope::from_event(event_name, &event) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(event = event_name, error = %e, "failed to encode domain event");
                metrics::counter!("event_publish_failures_total", "event" => event_name)
                    .increment(1);
                continue;
            }
        };

        match broker.publish(envelope).await {
            Ok(()) => {
                metrics::counter!("events_published_total", "event" => event_name).increment(1);
            }
            Err(e) => {
                metrics::counter!("event_publish_failures_total", "event" => event_name)
                    .increment(1);
                tracing::error!(
                    event = event_name,
                    aggregate_id = %event.aggregate_id(),
                    error = %e,
                    "failed to publish domain event"
                );
            }
        }
    }
}
