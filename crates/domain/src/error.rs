//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order must contain at least one line item.
    #[error("Order must contain at least one course")]
    NoLineItems,

    /// A line item carried a non-positive price.
    #[error("Invalid line price: {price} (must be greater than 0)")]
    InvalidPrice { price: f64 },

    /// A line item carried a zero quantity.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// A required customer field was empty.
    #[error("Customer {field} is required")]
    MissingCustomerField { field: &'static str },

    /// Cancellation attempted outside the Pending/Confirmed window.
    #[error("Cannot cancel order in {current} status")]
    NotCancellable { current: OrderStatus },

    /// Review rating outside the 1..=5 range.
    #[error("Rating must be between 1 and 5")]
    InvalidRating { rating: u8 },
}
