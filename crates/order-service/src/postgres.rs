//! PostgreSQL-backed order repository.

use std::str::FromStr;

use async_trait::async_trait;
use common::OrderId;
use domain::{CustomerId, Money, Order, OrderStatus, ProductId, SellerId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::repository::{OrderFilters, OrderRepository, RepositoryError};

const SELECT_COLUMNS: &str =
    "id, product_id, customer_id, seller_id, price_cents, quantity, status, created_at, updated_at";

/// PostgreSQL order repository.
///
/// Statuses are stored as their canonical strings; the event buffer is
/// never persisted.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a repository over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and creates a repository.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order, RepositoryError> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&status_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let quantity: i32 = row.try_get("quantity")?;

        Ok(Order::restore(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            ProductId::new(row.try_get::<String, _>("product_id")?),
            CustomerId::new(row.try_get::<String, _>("customer_id")?),
            SellerId::new(row.try_get::<String, _>("seller_id")?),
            Money::from_cents(row.try_get("price_cents")?),
            quantity as u32,
            status,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, product_id, customer_id, seller_id, price_cents, quantity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.product_id().as_str())
        .bind(order.customer_id().as_str())
        .bind(order.seller_id().as_str())
        .bind(order.price().cents())
        .bind(order.quantity() as i32)
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "Order with ID {} already exists",
                    order.id()
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
        let mut builder = sqlx::QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE TRUE"
        ));

        if let Some(ref seller_id) = filters.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id);
        }
        if let Some(ref customer_id) = filters.customer_id {
            builder.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(status) = filters.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.updated_at())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(order.id().to_string()));
        }
        Ok(())
    }
}
