//! Synchronous fallback validation.
//!
//! When the fabric is down, orders are validated inline instead of queueing
//! up unvalidated. The fallback path trades thoroughness for availability:
//! it runs the payment checks and the debit but never consults stock, since
//! the conditional decrement at completion is what actually protects
//! inventory and skipping the advisory read keeps the degraded path short.

use common::OrderId;
use domain::{Money, Order, OrderStatus};

use crate::error::Result;
use crate::services::{BalanceService, OrderStore};

/// Inline validator used when publishing to the fabric fails.
pub struct DirectValidator<O, B> {
    orders: O,
    balance: B,
    minimum_charge: Money,
}

impl<O, B> DirectValidator<O, B>
where
    O: OrderStore,
    B: BalanceService,
{
    /// Creates a new direct validator.
    pub fn new(orders: O, balance: B, minimum_charge: Money) -> Self {
        Self {
            orders,
            balance,
            minimum_charge,
        }
    }

    /// Validates and settles an order inline, without the fabric.
    ///
    /// Terminal writes go through the same status compare-and-set as the
    /// stage handlers, and the debit only happens after winning it: a
    /// cancellation that lands during the fallback window keeps the order
    /// cancelled and the balance untouched. Returns the status the stored
    /// order actually reached.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn validate_and_complete(&self, order: Order) -> Result<OrderStatus> {
        metrics::counter!("saga_direct_validations_total").increment(1);

        let previous_status = order.status();
        if previous_status.is_terminal() {
            tracing::info!(status = %previous_status, "order already terminal, nothing to validate");
            return Ok(previous_status);
        }

        if order.total_amount() < self.minimum_charge {
            tracing::warn!(
                total = %order.total_amount(),
                minimum = %self.minimum_charge,
                "direct validation: order amount below minimum charge"
            );
            return self.settle_rejected(order, previous_status).await;
        }

        let balance = match self.balance.get_balance(order.customer_id()).await {
            Ok(Some(balance)) => balance,
            Ok(None) => {
                tracing::warn!(customer_id = %order.customer_id(), "direct validation: unknown customer account");
                return self.settle_rejected(order, previous_status).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "direct validation: balance unreachable");
                return self.settle_rejected(order, previous_status).await;
            }
        };

        if balance < order.total_amount() {
            tracing::warn!(
                balance = %balance,
                total = %order.total_amount(),
                "direct validation: insufficient balance"
            );
            return self.settle_rejected(order, previous_status).await;
        }

        let mut completed = order.clone();
        completed.complete()?;
        if !self.orders.save_if_status(completed, previous_status).await? {
            return self.concede(order.id(), previous_status).await;
        }

        // Same policy as the completion stage: the order is terminal now,
        // a debit refusal in the remaining race window is a recorded
        // inconsistency, not a rollback.
        match self
            .balance
            .debit(order.customer_id(), order.total_amount())
            .await
        {
            Ok(outcome) if outcome.ok => {
                tracing::info!(new_balance = %outcome.new_balance, "direct validation: balance debited");
            }
            Ok(_) => {
                tracing::error!(
                    customer_id = %order.customer_id(),
                    amount = %order.total_amount(),
                    "direct validation: order completed but debit was refused"
                );
                metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
            }
            Err(e) => {
                tracing::error!(error = %e, "direct validation: order completed but debit failed");
                metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
            }
        }

        tracing::info!("direct validation: order completed");
        Ok(OrderStatus::Completed)
    }

    async fn settle_rejected(&self, order: Order, expected: OrderStatus) -> Result<OrderStatus> {
        metrics::counter!("saga_direct_validation_failures_total").increment(1);
        let order_id = order.id();
        let mut rejected = order;
        rejected.reject(true)?;
        if !self.orders.save_if_status(rejected, expected).await? {
            return self.concede(order_id, expected).await;
        }
        Ok(OrderStatus::Rejected)
    }

    /// A concurrent writer settled the order first; report what it became.
    async fn concede(&self, order_id: OrderId, fallback: OrderStatus) -> Result<OrderStatus> {
        let current = self
            .orders
            .load(order_id)
            .await?
            .map_or(fallback, |o| o.status());
        tracing::warn!(status = %current, "inline validation lost the race to a concurrent write");
        metrics::counter!("saga_direct_validation_conflicts_total").increment(1);
        Ok(current)
    }
}
