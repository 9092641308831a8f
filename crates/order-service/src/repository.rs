//! Order persistence contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{CustomerId, Money, Order, OrderStatus, ProductId, SellerId};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No row matched the given identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be decoded.
    #[error("Invalid stored data: {0}")]
    Decode(String),
}

/// Optional filters for listing orders. Present filters are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilters {
    fn matches(&self, order: &Order) -> bool {
        if let Some(ref seller_id) = self.seller_id
            && order.seller_id().as_str() != seller_id
        {
            return false;
        }
        if let Some(ref customer_id) = self.customer_id
            && order.customer_id().as_str() != customer_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        true
    }
}

/// Persistence contract for the order aggregate.
///
/// Repositories store aggregate state only; the domain event buffer is
/// never persisted.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order. Fails with `Conflict` if the ID is taken.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Loads an order by ID.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Lists orders matching the filters, newest first.
    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError>;

    /// Persists the current state of an existing order.
    async fn update(&self, order: &Order) -> Result<(), RepositoryError>;
}

/// Snapshot of an order's persisted state.
#[derive(Debug, Clone)]
struct StoredOrder {
    id: OrderId,
    product_id: String,
    customer_id: String,
    seller_id: String,
    price_cents: i64,
    quantity: u32,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredOrder {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id(),
            product_id: order.product_id().as_str().to_string(),
            customer_id: order.customer_id().as_str().to_string(),
            seller_id: order.seller_id().as_str().to_string(),
            price_cents: order.price().cents(),
            quantity: order.quantity(),
            status: order.status(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }

    fn into_order(self) -> Order {
        Order::restore(
            self.id,
            ProductId::new(self.product_id),
            CustomerId::new(self.customer_id),
            SellerId::new(self.seller_id),
            Money::from_cents(self.price_cents),
            self.quantity,
            self.status,
            self.created_at,
            self.updated_at,
        )
    }
}

/// In-memory order repository for tests and development.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, StoredOrder>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(RepositoryError::Conflict(format!(
                "Order with ID {} already exists",
                order.id()
            )));
        }
        orders.insert(order.id(), StoredOrder::from_order(order));
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned().map(StoredOrder::into_order))
    }

    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .cloned()
            .map(StoredOrder::into_order)
            .filter(|order| filters.matches(order))
            .collect();
        result.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(result)
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id()) {
            return Err(RepositoryError::NotFound(order.id().to_string()));
        }
        orders.insert(order.id(), StoredOrder::from_order(order));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(seller_id: &str) -> Order {
        Order::create(
            "product-1",
            "customer-1",
            seller_id,
            Money::from_cents(1000),
            2,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let repository = InMemoryOrderRepository::new();
        let order = sample_order("seller-1");

        repository.insert(&order).await.unwrap();

        let loaded = repository.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded.id(), order.id());
        assert_eq!(loaded.status(), OrderStatus::Created);
        // The event buffer is never persisted.
        assert!(loaded.domain_events().is_empty());
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_conflicts() {
        let repository = InMemoryOrderRepository::new();
        let order = sample_order("seller-1");

        repository.insert(&order).await.unwrap();
        let result = repository.insert(&order).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(repository.count().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_id_miss_returns_none() {
        let repository = InMemoryOrderRepository::new();
        let result = repository.find_by_id(OrderId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_persists_new_status() {
        let repository = InMemoryOrderRepository::new();
        let mut order = sample_order("seller-1");
        repository.insert(&order).await.unwrap();

        order.update_status(OrderStatus::Accepted).unwrap();
        repository.update(&order).await.unwrap();

        let loaded = repository.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_update_missing_order_fails() {
        let repository = InMemoryOrderRepository::new();
        let order = sample_order("seller-1");

        let result = repository.update(&order).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_all_with_filters() {
        let repository = InMemoryOrderRepository::new();
        let order_a = sample_order("seller-a");
        let order_b = sample_order("seller-b");
        repository.insert(&order_a).await.unwrap();
        repository.insert(&order_b).await.unwrap();

        let all = repository.find_all(&OrderFilters::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = repository
            .find_all(&OrderFilters {
                seller_id: Some("seller-a".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id(), order_a.id());

        let none = repository
            .find_all(&OrderFilters {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
