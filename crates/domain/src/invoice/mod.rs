//! Invoice aggregate and related types.

mod aggregate;
mod events;

pub use aggregate::Invoice;
pub use events::{InvoiceEvent, InvoiceSentData};

use thiserror::Error;

/// Errors that can occur during invoice operations.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Order ID is required.
    #[error("Order ID is required")]
    OrderIdRequired,

    /// PDF path is required.
    #[error("PDF path is required")]
    PdfPathRequired,

    /// The invoice was already sent.
    #[error("Invoice has already been sent")]
    AlreadySent,
}
