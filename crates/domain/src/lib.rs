//! Domain layer for the marketplace services.
//!
//! Both bounded contexts live here:
//! - The order aggregate with its status state machine, owned by the
//!   order service.
//! - The invoice aggregate with its at-most-once sent flag, owned by the
//!   invoice service.
//!
//! Aggregates buffer domain events as a side effect of mutation. The
//! buffer is caller-owned output: reading returns a view, draining
//! returns and clears. Aggregates never dispatch or clear events on
//! their own.

pub mod event;
pub mod invoice;
pub mod order;

pub use event::DomainEvent;
pub use invoice::{Invoice, InvoiceError, InvoiceEvent, InvoiceSentData};
pub use order::{
    CustomerId, Money, Order, OrderCreatedData, OrderError, OrderEvent, OrderShippedData,
    OrderStatus, OrderStatusChangedData, ProductId, SellerId,
};
