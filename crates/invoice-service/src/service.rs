//! Invoice application layer.

use domain::{Invoice, InvoiceError};
use thiserror::Error;

use crate::repository::{InvoiceRepository, RepositoryError};

/// Errors from invoice operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No invoice exists for the order.
    #[error("Invoice for order {0} not found")]
    NotFound(String),

    /// An invoice already exists for the order.
    #[error("Invoice for order {0} already exists")]
    Conflict(String),

    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] InvoiceError),

    /// The storage layer failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Application service for the invoice bounded context.
pub struct InvoiceService<R> {
    repository: R,
}

impl<R: InvoiceRepository> InvoiceService<R> {
    /// Creates a new invoice service over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Registers an uploaded invoice PDF for an order.
    ///
    /// At most one invoice exists per order. The pre-check catches the
    /// common case; concurrent uploads that race past it are arbitrated
    /// by the storage engine's unique constraint, which surfaces as the
    /// same conflict.
    #[tracing::instrument(skip(self, pdf_path))]
    pub async fn upload_invoice(
        &self,
        order_id: &str,
        pdf_path: &str,
    ) -> Result<Invoice, ServiceError> {
        if self.repository.find_by_order_id(order_id).await?.is_some() {
            return Err(ServiceError::Conflict(order_id.to_string()));
        }

        let invoice = Invoice::create(order_id, pdf_path)?;

        match self.repository.insert(&invoice).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                return Err(ServiceError::Conflict(order_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("invoices_uploaded_total").increment(1);
        tracing::info!(order_id, invoice_id = %invoice.id(), "invoice uploaded");
        Ok(invoice)
    }

    /// Sends the invoice for a shipped order.
    ///
    /// This is the saga's idempotency boundary, tolerant of duplicate and
    /// redelivered trigger events:
    /// - no invoice for the order → an error; the upload must have
    ///   happened first and a missing invoice is reported, never skipped
    /// - invoice already sent → returns it unchanged (no-op, no event)
    /// - invoice unsent → marks it sent, persists, and returns it with
    ///   the buffered `invoice.sent` event
    #[tracing::instrument(skip(self))]
    pub async fn send_invoice(&self, order_id: &str) -> Result<Invoice, ServiceError> {
        let Some(mut invoice) = self.repository.find_by_order_id(order_id).await? else {
            return Err(ServiceError::NotFound(order_id.to_string()));
        };

        if invoice.is_sent() {
            tracing::debug!(order_id, "invoice already sent, duplicate trigger is a no-op");
            return Ok(invoice);
        }

        invoice.mark_sent()?;
        self.repository.update(&invoice).await?;

        metrics::counter!("invoices_sent_total").increment(1);
        tracing::info!(order_id, invoice_id = %invoice.id(), "invoice sent");
        Ok(invoice)
    }

    /// Loads the invoice for an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_invoice(&self, order_id: &str) -> Result<Invoice, ServiceError> {
        self.repository
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(order_id.to_string()))
    }
}
