//! Order domain events.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;

use super::{CustomerId, Money, OrderStatus, ProductId, SellerId};

/// Events emitted by the order aggregate.
///
/// Untagged: an event serializes as its data struct alone, so the wire
/// record stays flat once the envelope adds the event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderEvent {
    /// A new order was placed.
    Created(OrderCreatedData),

    /// The order moved to a new status.
    StatusChanged(OrderStatusChangedData),

    /// The order reached the Shipped status.
    Shipped(OrderShippedData),
}

impl DomainEvent for OrderEvent {
    fn event_name(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "order.created",
            OrderEvent::StatusChanged(_) => "order.status.changed",
            OrderEvent::Shipped(_) => "order.shipped",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            OrderEvent::Created(data) => data.aggregate_id.to_string(),
            OrderEvent::StatusChanged(data) => data.aggregate_id.to_string(),
            OrderEvent::Shipped(data) => data.aggregate_id.to_string(),
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Created(data) => data.occurred_on,
            OrderEvent::StatusChanged(data) => data.occurred_on,
            OrderEvent::Shipped(data) => data.occurred_on,
        }
    }
}

/// Data for the `order.created` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedData {
    /// The order the event happened to.
    pub aggregate_id: OrderId,

    /// The ordered product.
    pub product_id: ProductId,

    /// The customer who placed the order.
    pub customer_id: CustomerId,

    /// The seller fulfilling the order.
    pub seller_id: SellerId,

    /// Unit price at creation time.
    pub price: Money,

    /// Ordered quantity.
    pub quantity: u32,

    /// When the order was created.
    pub occurred_on: DateTime<Utc>,
}

/// Data for the `order.status.changed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChangedData {
    /// The order the event happened to.
    pub aggregate_id: OrderId,

    /// Status before the transition.
    pub old_status: OrderStatus,

    /// Status after the transition.
    pub new_status: OrderStatus,

    /// When the transition happened.
    pub occurred_on: DateTime<Utc>,
}

/// Data for the `order.shipped` event.
///
/// Emitted in addition to the status-changed event when an order reaches
/// Shipped; this is the event the invoice service consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderShippedData {
    /// The shipped order.
    pub aggregate_id: OrderId,

    /// The seller who shipped it.
    pub seller_id: SellerId,

    /// When the order was shipped.
    pub occurred_on: DateTime<Utc>,
}

// Convenience constructors for events
impl OrderEvent {
    /// Creates an `order.created` event.
    pub fn created(
        aggregate_id: OrderId,
        product_id: ProductId,
        customer_id: CustomerId,
        seller_id: SellerId,
        price: Money,
        quantity: u32,
    ) -> Self {
        OrderEvent::Created(OrderCreatedData {
            aggregate_id,
            product_id,
            customer_id,
            seller_id,
            price,
            quantity,
            occurred_on: Utc::now(),
        })
    }

    /// Creates an `order.status.changed` event.
    pub fn status_changed(
        aggregate_id: OrderId,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Self {
        OrderEvent::StatusChanged(OrderStatusChangedData {
            aggregate_id,
            old_status,
            new_status,
            occurred_on: Utc::now(),
        })
    }

    /// Creates an `order.shipped` event.
    pub fn shipped(aggregate_id: OrderId, seller_id: SellerId) -> Self {
        OrderEvent::Shipped(OrderShippedData {
            aggregate_id,
            seller_id,
            occurred_on: Utc::now(),
        })
    }
}
