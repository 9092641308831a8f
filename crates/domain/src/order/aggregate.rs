//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::OrderId;

use super::{CustomerId, Money, OrderError, OrderEvent, OrderStatus, ProductId, SellerId};

/// Order aggregate root.
///
/// Owns the order's identity, invariants, and status state machine.
/// Mutations buffer domain events; the caller drains the buffer with
/// [`Order::take_domain_events`] after the write has been persisted.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    product_id: ProductId,
    customer_id: CustomerId,
    seller_id: SellerId,
    price: Money,
    quantity: u32,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<OrderEvent>,
}

impl Order {
    /// Creates a new order in the `Created` status.
    ///
    /// Invariants are checked in a fixed order (product, customer,
    /// seller, price, quantity) so the first violated field is the one
    /// reported. On success a fresh ID is assigned and an
    /// `order.created` event is buffered.
    pub fn create(
        product_id: impl Into<ProductId>,
        customer_id: impl Into<CustomerId>,
        seller_id: impl Into<SellerId>,
        price: Money,
        quantity: i64,
    ) -> Result<Order, OrderError> {
        let product_id = product_id.into();
        let customer_id = customer_id.into();
        let seller_id = seller_id.into();

        if product_id.as_str().trim().is_empty() {
            return Err(OrderError::ProductIdRequired);
        }
        if customer_id.as_str().trim().is_empty() {
            return Err(OrderError::CustomerIdRequired);
        }
        if seller_id.as_str().trim().is_empty() {
            return Err(OrderError::SellerIdRequired);
        }
        if !price.is_positive() {
            return Err(OrderError::InvalidPrice {
                price: price.cents(),
            });
        }
        if quantity <= 0 || quantity > u32::MAX as i64 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        let now = Utc::now();
        let mut order = Order {
            id: OrderId::new(),
            product_id,
            customer_id,
            seller_id,
            price,
            quantity: quantity as u32,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        order.events.push(OrderEvent::created(
            order.id,
            order.product_id.clone(),
            order.customer_id.clone(),
            order.seller_id.clone(),
            order.price,
            order.quantity,
        ));

        Ok(order)
    }

    /// Rehydrates an order from persisted state.
    ///
    /// Trusts the stored values and buffers no events.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        product_id: ProductId,
        customer_id: CustomerId,
        seller_id: SellerId,
        price: Money,
        quantity: u32,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Order {
        Order {
            id,
            product_id,
            customer_id,
            seller_id,
            price,
            quantity,
            status,
            created_at,
            updated_at,
            events: Vec::new(),
        }
    }

    /// Moves the order to a new status.
    ///
    /// Consults the transition table; a denied transition leaves status,
    /// `updated_at`, and the event buffer untouched. A legal transition
    /// buffers `order.status.changed`, and additionally `order.shipped`
    /// when the new status is Shipped.
    pub fn update_status(&mut self, new_status: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(new_status) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        let old_status = self.status;
        self.status = new_status;
        self.updated_at = Utc::now();

        self.events
            .push(OrderEvent::status_changed(self.id, old_status, new_status));

        if new_status == OrderStatus::Shipped {
            self.events
                .push(OrderEvent::shipped(self.id, self.seller_id.clone()));
        }

        Ok(())
    }

    /// Total price of the order (unit price × quantity).
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    /// Returns the buffered domain events without draining them.
    pub fn domain_events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Drains the event buffer, returning the events and leaving it empty.
    ///
    /// The aggregate never clears the buffer on its own; at-most-once
    /// local dispatch is the caller's responsibility.
    pub fn take_domain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the product reference.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the customer reference.
    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    /// Returns the seller reference.
    pub fn seller_id(&self) -> &SellerId {
        &self.seller_id
    }

    /// Returns the unit price.
    pub fn price(&self) -> Money {
        self.price
    }

    /// Returns the ordered quantity.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the order was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DomainEvent;

    fn create_order() -> Order {
        Order::create(
            "product-1",
            "customer-1",
            "seller-1",
            Money::from_cents(1000),
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_create_order() {
        let order = create_order();
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.quantity(), 2);
        assert_eq!(order.price().cents(), 1000);
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn test_create_buffers_exactly_one_created_event() {
        let order = create_order();
        assert_eq!(order.domain_events().len(), 1);
        assert_eq!(order.domain_events()[0].event_name(), "order.created");
        assert_eq!(
            order.domain_events()[0].aggregate_id(),
            order.id().to_string()
        );
    }

    #[test]
    fn test_total_price() {
        let order = Order::create(
            "product-1",
            "customer-1",
            "seller-1",
            Money::from_cents(3999),
            3,
        )
        .unwrap();
        assert_eq!(order.total_price().cents(), 11997);
    }

    #[test]
    fn test_create_empty_product_id_fails() {
        let result = Order::create("  ", "customer-1", "seller-1", Money::from_cents(1000), 1);
        assert!(matches!(result, Err(OrderError::ProductIdRequired)));
    }

    #[test]
    fn test_create_empty_customer_id_fails() {
        let result = Order::create("product-1", "", "seller-1", Money::from_cents(1000), 1);
        assert!(matches!(result, Err(OrderError::CustomerIdRequired)));
    }

    #[test]
    fn test_create_empty_seller_id_fails() {
        let result = Order::create("product-1", "customer-1", " ", Money::from_cents(1000), 1);
        assert!(matches!(result, Err(OrderError::SellerIdRequired)));
    }

    #[test]
    fn test_create_non_positive_price_fails() {
        let result = Order::create("product-1", "customer-1", "seller-1", Money::from_cents(0), 1);
        assert!(matches!(result, Err(OrderError::InvalidPrice { price: 0 })));

        let result = Order::create(
            "product-1",
            "customer-1",
            "seller-1",
            Money::from_cents(-500),
            1,
        );
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_create_non_positive_quantity_fails() {
        for quantity in [0, -3] {
            let result = Order::create(
                "product-1",
                "customer-1",
                "seller-1",
                Money::from_cents(1000),
                quantity,
            );
            assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
        }
    }

    #[test]
    fn test_validation_reports_first_violated_field() {
        // Everything invalid at once: the product check fires first.
        let result = Order::create("", "", "", Money::from_cents(0), 0);
        assert!(matches!(result, Err(OrderError::ProductIdRequired)));

        // Product valid, everything else invalid: customer is next.
        let result = Order::create("product-1", "", "", Money::from_cents(0), 0);
        assert!(matches!(result, Err(OrderError::CustomerIdRequired)));

        // Price invalid beats quantity invalid.
        let result = Order::create("product-1", "customer-1", "seller-1", Money::from_cents(0), 0);
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_update_status_legal_transition() {
        let mut order = create_order();
        order.take_domain_events();

        order.update_status(OrderStatus::Accepted).unwrap();

        assert_eq!(order.status(), OrderStatus::Accepted);
        assert_eq!(order.domain_events().len(), 1);
        assert_eq!(
            order.domain_events()[0].event_name(),
            "order.status.changed"
        );
    }

    #[test]
    fn test_update_status_refreshes_updated_at() {
        let mut order = create_order();
        let before = order.updated_at();

        let created_at = order.created_at();
        order.update_status(OrderStatus::Accepted).unwrap();

        assert!(order.updated_at() >= before);
        assert_eq!(order.created_at(), created_at);
    }

    #[test]
    fn test_update_status_denied_leaves_state_untouched() {
        let mut order = create_order();
        order.take_domain_events();
        let updated_at = order.updated_at();

        let result = order.update_status(OrderStatus::Shipped);

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Created,
                to: OrderStatus::Shipped,
            })
        ));
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.updated_at(), updated_at);
        assert!(order.domain_events().is_empty());
    }

    #[test]
    fn test_full_lifecycle_to_shipped() {
        let mut order = create_order();
        order.take_domain_events();

        order.update_status(OrderStatus::Accepted).unwrap();
        order.update_status(OrderStatus::ShippingInProgress).unwrap();
        order.update_status(OrderStatus::Shipped).unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert!(order.status().is_terminal());
    }

    #[test]
    fn test_shipped_transition_buffers_both_events() {
        let mut order = create_order();
        order.update_status(OrderStatus::Accepted).unwrap();
        order.update_status(OrderStatus::ShippingInProgress).unwrap();
        order.take_domain_events();

        order.update_status(OrderStatus::Shipped).unwrap();

        let events = order.domain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_name(), "order.status.changed");
        assert_eq!(events[1].event_name(), "order.shipped");

        let OrderEvent::Shipped(data) = &events[1] else {
            panic!("expected shipped event");
        };
        assert_eq!(data.seller_id.as_str(), "seller-1");
    }

    #[test]
    fn test_rejected_is_terminal() {
        let mut order = create_order();
        order.update_status(OrderStatus::Rejected).unwrap();

        let result = order.update_status(OrderStatus::Accepted);
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[test]
    fn test_take_domain_events_drains_buffer() {
        let mut order = create_order();
        let events = order.take_domain_events();
        assert_eq!(events.len(), 1);
        assert!(order.domain_events().is_empty());

        // A second drain yields nothing.
        assert!(order.take_domain_events().is_empty());
    }

    #[test]
    fn test_restore_buffers_nothing() {
        let order = create_order();
        let restored = Order::restore(
            order.id(),
            order.product_id().clone(),
            order.customer_id().clone(),
            order.seller_id().clone(),
            order.price(),
            order.quantity(),
            order.status(),
            order.created_at(),
            order.updated_at(),
        );

        assert!(restored.domain_events().is_empty());
        assert_eq!(restored.id(), order.id());
        assert_eq!(restored.status(), order.status());
    }
}
