//! PostgreSQL-backed invoice repository.

use async_trait::async_trait;
use common::InvoiceId;
use domain::Invoice;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::repository::{InvoiceRepository, RepositoryError};

const SELECT_COLUMNS: &str = "id, order_id, pdf_path, sent_at, created_at, updated_at";

/// PostgreSQL invoice repository.
///
/// The unique index on `order_id` arbitrates races between concurrent
/// uploads: the loser's insert surfaces the same `Conflict` the pre-check
/// would have produced.
#[derive(Clone)]
pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
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

    fn row_to_invoice(row: PgRow) -> Result<Invoice, RepositoryError> {
        Ok(Invoice::restore(
            InvoiceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("order_id")?,
            row.try_get("pdf_path")?,
            row.try_get("sent_at")?,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (id, order_id, pdf_path, sent_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invoice.id().as_uuid())
        .bind(invoice.order_id())
        .bind(invoice.pdf_path())
        .bind(invoice.sent_at())
        .bind(invoice.created_at())
        .bind(invoice.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "Invoice for order {} already exists",
                    invoice.order_id()
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_invoice).transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM invoices WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_invoice).transpose()
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE invoices SET sent_at = $2, updated_at = $3 WHERE id = $1")
                .bind(invoice.id().as_uuid())
                .bind(invoice.sent_at())
                .bind(invoice.updated_at())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(invoice.id().to_string()));
        }
        Ok(())
    }
}
