//! Invoice aggregate implementation.

use chrono::{DateTime, Utc};
use common::InvoiceId;

use super::{InvoiceError, InvoiceEvent};

/// Invoice aggregate root.
///
/// Owns the at-most-once sent flag for one order's invoice. The `order_id`
/// is an opaque reference to the order bounded context; this service never
/// reads the order itself.
#[derive(Debug, Clone)]
pub struct Invoice {
    id: InvoiceId,
    order_id: String,
    pdf_path: String,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<InvoiceEvent>,
}

impl Invoice {
    /// Creates a new, unsent invoice for an order.
    pub fn create(
        order_id: impl Into<String>,
        pdf_path: impl Into<String>,
    ) -> Result<Invoice, InvoiceError> {
        let order_id = order_id.into();
        let pdf_path = pdf_path.into();

        if order_id.trim().is_empty() {
            return Err(InvoiceError::OrderIdRequired);
        }
        if pdf_path.trim().is_empty() {
            return Err(InvoiceError::PdfPathRequired);
        }

        let now = Utc::now();
        Ok(Invoice {
            id: InvoiceId::new(),
            order_id,
            pdf_path,
            sent_at: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        })
    }

    /// Rehydrates an invoice from persisted state. Buffers no events.
    pub fn restore(
        id: InvoiceId,
        order_id: String,
        pdf_path: String,
        sent_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Invoice {
        Invoice {
            id,
            order_id,
            pdf_path,
            sent_at,
            created_at,
            updated_at,
            events: Vec::new(),
        }
    }

    /// Marks the invoice as sent.
    ///
    /// The sent timestamp transitions from `None` to `Some` exactly once;
    /// a second call fails with [`InvoiceError::AlreadySent`]. Callers
    /// that must tolerate duplicate triggers check [`Invoice::is_sent`]
    /// first and treat an already-sent invoice as a no-op.
    pub fn mark_sent(&mut self) -> Result<(), InvoiceError> {
        if self.sent_at.is_some() {
            return Err(InvoiceError::AlreadySent);
        }

        let now = Utc::now();
        self.sent_at = Some(now);
        self.updated_at = now;

        self.events
            .push(InvoiceEvent::sent(self.id, self.order_id.clone()));

        Ok(())
    }

    /// Returns true if the invoice has been sent.
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Returns the buffered domain events without draining them.
    pub fn domain_events(&self) -> &[InvoiceEvent] {
        &self.events
    }

    /// Drains the event buffer, returning the events and leaving it empty.
    pub fn take_domain_events(&mut self) -> Vec<InvoiceEvent> {
        std::mem::take(&mut self.events)
    }
}

// Query methods
impl Invoice {
    /// Returns the invoice ID.
    pub fn id(&self) -> InvoiceId {
        self.id
    }

    /// Returns the order this invoice belongs to.
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Returns the storage reference of the invoice PDF.
    pub fn pdf_path(&self) -> &str {
        &self.pdf_path
    }

    /// Returns when the invoice was sent, if it has been.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    /// Returns when the invoice was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the invoice was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
