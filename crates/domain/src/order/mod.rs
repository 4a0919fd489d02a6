//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{CustomerId, ItemId, Money, OrderLine};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested transition conflicts with the order's current status.
    ///
    /// Terminal statuses are never overwritten; cancelling a completed
    /// order fails with this error.
    #[error("conflicting state: cannot {action} an order in {current} status")]
    ConflictingState {
        current: OrderStatus,
        action: &'static str,
    },

    /// Order has no line items.
    #[error("order has no line items")]
    NoLines,

    /// Invalid quantity on a line item.
    #[error("invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },
}
