//! Self-describing message envelope.

use common::MessageId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A domain event serialized for transport.
///
/// The event's own fields are flattened into the envelope, so the wire
/// format is one flat JSON record with stable, self-describing field
/// names (no schema registry):
///
/// ```json
/// {"eventName":"order.shipped","messageId":"…","aggregateId":"…","sellerId":"…","occurredOn":"…"}
/// ```
///
/// The event name doubles as the routing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Dot-namespaced event name.
    pub event_name: String,

    /// Unique id assigned at publish time.
    pub message_id: MessageId,

    /// The event's own fields.
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl MessageEnvelope {
    /// Wraps a serializable event under the given routing key.
    pub fn from_event<E: Serialize>(event_name: &str, event: &E) -> Result<Self> {
        Ok(Self {
            event_name: event_name.to_string(),
            message_id: MessageId::new(),
            payload: serde_json::to_value(event)?,
        })
    }

    /// Returns the routing key for this message.
    pub fn routing_key(&self) -> &str {
        &self.event_name
    }

    /// Deserializes the payload into the expected event shape.
    ///
    /// Only the presence of the target's required fields is checked;
    /// unknown fields are ignored.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct TestEvent {
        aggregate_id: String,
        seller_id: String,
    }

    #[test]
    fn test_wire_format_is_flat() {
        let event = TestEvent {
            aggregate_id: "order-1".to_string(),
            seller_id: "seller-1".to_string(),
        };
        let envelope = MessageEnvelope::from_event("order.shipped", &event).unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["eventName"], "order.shipped");
        assert_eq!(json["aggregateId"], "order-1");
        assert_eq!(json["sellerId"], "seller-1");
        assert!(json["messageId"].is_string());
        // No nested payload object on the wire.
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_payload_roundtrip() {
        let event = TestEvent {
            aggregate_id: "order-1".to_string(),
            seller_id: "seller-1".to_string(),
        };
        let envelope = MessageEnvelope::from_event("order.shipped", &event).unwrap();

        let wire = serde_json::to_string(&envelope).unwrap();
        let received: MessageEnvelope = serde_json::from_str(&wire).unwrap();

        assert_eq!(received.routing_key(), "order.shipped");
        let decoded: TestEvent = received.payload_as().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_payload_as_rejects_missing_fields() {
        let envelope = MessageEnvelope::from_event(
            "order.shipped",
            &serde_json::json!({"aggregateId": "order-1"}),
        )
        .unwrap();

        let result: Result<TestEvent> = envelope.payload_as();
        assert!(result.is_err());
    }

    #[test]
    fn test_fresh_message_id_per_publish() {
        let event = serde_json::json!({"aggregateId": "order-1"});
        let first = MessageEnvelope::from_event("order.created", &event).unwrap();
        let second = MessageEnvelope::from_event("order.created", &event).unwrap();
        assert_ne!(first.message_id, second.message_id);
    }
}
