//! Shared types used by both marketplace services.

mod types;

pub use types::{InvoiceId, MessageId, OrderId};
