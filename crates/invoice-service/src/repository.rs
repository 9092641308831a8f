//! Invoice persistence contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::InvoiceId;
use domain::Invoice;
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

/// Persistence contract for the invoice aggregate.
///
/// At most one invoice exists per order: `insert` fails with `Conflict`
/// when the order already has one, whether detected by a pre-check or by
/// the storage engine's unique constraint. The domain event buffer is
/// never persisted.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Inserts a new invoice. Fails with `Conflict` on a duplicate order.
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError>;

    /// Loads an invoice by its own ID.
    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError>;

    /// Loads the invoice belonging to an order.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>, RepositoryError>;

    /// Persists the current state of an existing invoice.
    async fn update(&self, invoice: &Invoice) -> Result<(), RepositoryError>;
}

/// Snapshot of an invoice's persisted state.
#[derive(Debug, Clone)]
struct StoredInvoice {
    id: InvoiceId,
    order_id: String,
    pdf_path: String,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredInvoice {
    fn from_invoice(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id(),
            order_id: invoice.order_id().to_string(),
            pdf_path: invoice.pdf_path().to_string(),
            sent_at: invoice.sent_at(),
            created_at: invoice.created_at(),
            updated_at: invoice.updated_at(),
        }
    }

    fn into_invoice(self) -> Invoice {
        Invoice::restore(
            self.id,
            self.order_id,
            self.pdf_path,
            self.sent_at,
            self.created_at,
            self.updated_at,
        )
    }
}

/// In-memory invoice repository for tests and development.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceRepository {
    inner: Arc<RwLock<Store>>,
}

#[derive(Default)]
struct Store {
    invoices: HashMap<InvoiceId, StoredInvoice>,
    // Simulates the unique index on order_id.
    order_index: HashMap<String, InvoiceId>,
}

impl InMemoryInvoiceRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored invoices.
    pub async fn count(&self) -> usize {
        self.inner.read().await.invoices.len()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let mut store = self.inner.write().await;
        if store.order_index.contains_key(invoice.order_id()) {
            return Err(RepositoryError::Conflict(format!(
                "Invoice for order {} already exists",
                invoice.order_id()
            )));
        }
        store
            .order_index
            .insert(invoice.order_id().to_string(), invoice.id());
        store
            .invoices
            .insert(invoice.id(), StoredInvoice::from_invoice(invoice));
        Ok(())
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let store = self.inner.read().await;
        Ok(store
            .invoices
            .get(&id)
            .cloned()
            .map(StoredInvoice::into_invoice))
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>, RepositoryError> {
        let store = self.inner.read().await;
        Ok(store
            .order_index
            .get(order_id)
            .and_then(|id| store.invoices.get(id))
            .cloned()
            .map(StoredInvoice::into_invoice))
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let mut store = self.inner.write().await;
        if !store.invoices.contains_key(&invoice.id()) {
            return Err(RepositoryError::NotFound(invoice.id().to_string()));
        }
        store
            .invoices
            .insert(invoice.id(), StoredInvoice::from_invoice(invoice));
        Ok(())
    }
}
