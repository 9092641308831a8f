//! Invoice domain events.

use chrono::{DateTime, Utc};
use common::InvoiceId;
use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;

/// Events emitted by the invoice aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvoiceEvent {
    /// The invoice was sent for a shipped order.
    Sent(InvoiceSentData),
}

impl DomainEvent for InvoiceEvent {
    fn event_name(&self) -> &'static str {
        match self {
            InvoiceEvent::Sent(_) => "invoice.sent",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            InvoiceEvent::Sent(data) => data.aggregate_id.to_string(),
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::Sent(data) => data.occurred_on,
        }
    }
}

/// Data for the `invoice.sent` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSentData {
    /// The invoice the event happened to.
    pub aggregate_id: InvoiceId,

    /// The order the invoice belongs to.
    pub order_id: String,

    /// When the invoice was sent.
    pub occurred_on: DateTime<Utc>,
}

impl InvoiceEvent {
    /// Creates an `invoice.sent` event.
    pub fn sent(aggregate_id: InvoiceId, order_id: impl Into<String>) -> Self {
        InvoiceEvent::Sent(InvoiceSentData {
            aggregate_id,
            order_id: order_id.into(),
            occurred_on: Utc::now(),
        })
    }
}
