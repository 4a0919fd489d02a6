//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in the validation saga.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Accepted ──┬──► Completed
///           │               │
///           ├───────────────┴──► Rejected
///           │
///           └──► Cancelled   (also reachable from Accepted)
/// ```
///
/// `Completed` and `Rejected` are terminal and are only ever written by the
/// saga; `Cancelled` is reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created, validation saga in flight.
    #[default]
    Pending,

    /// Intermediate acknowledgement, reserved for future use.
    Accepted,

    /// All validations passed, balance debited, stock decremented (terminal).
    Completed,

    /// A validation stage failed (terminal).
    Rejected,

    /// Cancelled by the customer before the saga reached a terminal status.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be accepted from this status.
    pub fn can_accept(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the saga can complete the order from this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Accepted)
    }

    /// Returns true if the saga can reject the order from this status.
    pub fn can_reject(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Accepted)
    }

    /// Returns true if the order can be cancelled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Accepted)
    }

    /// Returns true if no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status attached to an order, advanced only by the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment has not been attempted.
    #[default]
    Unpaid,

    /// Balance was debited for the full order amount.
    Paid,

    /// Payment validation failed.
    Failed,
}

impl PaymentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
