//! Order application layer.

use std::str::FromStr;

use common::OrderId;
use domain::{Money, Order, OrderError, OrderStatus};
use thiserror::Error;

use crate::repository::{OrderFilters, OrderRepository, RepositoryError};

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub product_id: String,
    pub customer_id: String,
    pub seller_id: String,
    /// Unit price in cents.
    pub price_cents: i64,
    pub quantity: i64,
}

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The order does not exist.
    #[error("Order with ID {0} not found")]
    NotFound(OrderId),

    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] OrderError),

    /// The storage layer failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Application service for the order bounded context.
///
/// Every operation follows the same shape: load, check, mutate the
/// aggregate, persist, return the aggregate with its domain events still
/// buffered. The caller drains and publishes the events after the write
/// has committed; nothing here retries internally.
pub struct OrderService<R> {
    repository: R,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Creates a new order in the `Created` status.
    #[tracing::instrument(skip(self, cmd), fields(seller_id = %cmd.seller_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, ServiceError> {
        let order = Order::create(
            cmd.product_id,
            cmd.customer_id,
            cmd.seller_id,
            Money::from_cents(cmd.price_cents),
            cmd.quantity,
        )?;

        self.repository.insert(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id(), "order created");
        Ok(order)
    }

    /// Moves an order to a new status.
    ///
    /// The raw status string is normalized before the transition table is
    /// consulted, so `"shipped"` and `"Shipped"` are the same request.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order, ServiceError> {
        let new_status = OrderStatus::from_str(status)?;

        let mut order = self
            .repository
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound(order_id))?;

        order.update_status(new_status)?;
        self.repository.update(&order).await?;

        metrics::counter!("order_status_transitions_total", "to" => new_status.as_str())
            .increment(1);
        tracing::info!(order_id = %order_id, status = %new_status, "order status updated");
        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound(order_id))
    }

    /// Lists orders matching the filters, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filters: OrderFilters) -> Result<Vec<Order>, ServiceError> {
        Ok(self.repository.find_all(&filters).await?)
    }
}
