//! Order aggregate.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::state::{OrderStatus, PaymentStatus};
use super::value_objects::{CustomerId, Money, OrderLine};
use super::OrderError;

/// An order placed against the catalog by a customer.
///
/// The order store owns persistence; after creation, only the saga writes
/// `status` and `payment_status`, always through the guarded transitions
/// below. Terminal statuses are never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    lines: Vec<OrderLine>,
    total_amount: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order, computing the total from line subtotals.
    ///
    /// Fails if there are no line items.
    pub fn new(customer_id: CustomerId, lines: Vec<OrderLine>) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        let total_amount = lines.iter().map(|line| line.subtotal).sum();
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            customer_id,
            lines,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the customer ID.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the line items.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the order total, frozen at creation time.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the current payment status.
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the order was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Acknowledges the order (Pending → Accepted).
    pub fn accept(&mut self) -> Result<(), OrderError> {
        if !self.status.can_accept() {
            return Err(OrderError::ConflictingState {
                current: self.status,
                action: "accept",
            });
        }
        self.transition(OrderStatus::Accepted, self.payment_status);
        Ok(())
    }

    /// Marks the order completed and paid.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        if !self.status.can_complete() {
            return Err(OrderError::ConflictingState {
                current: self.status,
                action: "complete",
            });
        }
        self.transition(OrderStatus::Completed, PaymentStatus::Paid);
        Ok(())
    }

    /// Marks the order rejected.
    ///
    /// The payment status moves to `Failed` only when the rejection was
    /// caused by payment validation; a stock-only failure leaves it
    /// untouched, since payment was never attempted.
    pub fn reject(&mut self, payment_failed: bool) -> Result<(), OrderError> {
        if !self.status.can_reject() {
            return Err(OrderError::ConflictingState {
                current: self.status,
                action: "reject",
            });
        }
        let payment_status = if payment_failed {
            PaymentStatus::Failed
        } else {
            self.payment_status
        };
        self.transition(OrderStatus::Rejected, payment_status);
        Ok(())
    }

    /// Cancels the order.
    ///
    /// Fails with a conflicting-state error if the order already reached a
    /// terminal status; a completed order can never be cancelled.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::ConflictingState {
                current: self.status,
                action: "cancel",
            });
        }
        self.transition(OrderStatus::Cancelled, self.payment_status);
        Ok(())
    }

    fn transition(&mut self, status: OrderStatus, payment_status: PaymentStatus) {
        self.status = status;
        self.payment_status = payment_status;
        self.updated_at = Utc::now();
    }
}
