//! Order aggregate and related types.

mod aggregate;
mod events;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use events::{OrderCreatedData, OrderEvent, OrderShippedData, OrderStatusChangedData};
pub use status::OrderStatus;
pub use value_objects::{CustomerId, Money, ProductId, SellerId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Product ID is required.
    #[error("Product ID is required")]
    ProductIdRequired,

    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Seller ID is required.
    #[error("Seller ID is required")]
    SellerIdRequired,

    /// Invalid price.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: i64 },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be a positive integer)")]
    InvalidQuantity { quantity: i64 },

    /// The requested status transition is not allowed.
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The status string is not part of the closed status set.
    #[error("Invalid order status: {0}")]
    UnknownStatus(String),
}
