//! Order completion stage.

use async_trait::async_trait;
use fabric::{ConsumeError, MessageHandler};

use crate::error::{Result, SagaError};
use crate::message::ValidationMessage;
use crate::services::{BalanceService, InventoryService, OrderStore};

/// Terminal success stage: marks the order completed, debits the balance,
/// and decrements the inventory.
///
/// The three effects run without a shared transaction. The status
/// compare-and-set comes first and is the stage-completion guard: a
/// redelivered message finds the order already terminal (or loses the
/// conditional write) and skips the debit and decrement entirely, so the
/// balance is charged at most once. A debit or decrement that fails after
/// the order is terminal is a recorded inconsistency, logged and counted,
/// never rolled back.
pub struct CompletionHandler<O, B, I> {
    orders: O,
    balance: B,
    inventory: I,
}

impl<O, B, I> CompletionHandler<O, B, I>
where
    O: OrderStore,
    B: BalanceService,
    I: InventoryService,
{
    /// Creates a new completion handler.
    pub fn new(orders: O, balance: B, inventory: I) -> Self {
        Self {
            orders,
            balance,
            inventory,
        }
    }

    /// Applies the completion effects for a fully validated order.
    #[tracing::instrument(skip(self, message), fields(order_id = %message.order_id))]
    pub async fn handle(&self, message: ValidationMessage) -> Result<()> {
        metrics::counter!("saga_completions_total").increment(1);

        let order = self
            .orders
            .load(message.order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(message.order_id))?;

        let previous_status = order.status();
        if previous_status.is_terminal() {
            tracing::info!(status = %previous_status, "order already terminal, skipping redelivery");
            metrics::counter!("saga_completion_redeliveries_skipped_total").increment(1);
            return Ok(());
        }

        let mut completed = order;
        completed.complete()?;

        if !self.orders.save_if_status(completed, previous_status).await? {
            tracing::info!("lost completion race to a concurrent delivery, skipping");
            metrics::counter!("saga_completion_redeliveries_skipped_total").increment(1);
            return Ok(());
        }

        // Past this point the order is terminal; failures below are recorded
        // inconsistencies, not retried through redelivery.
        match self
            .balance
            .debit(message.customer_id, message.total_amount)
            .await
        {
            Ok(outcome) if outcome.ok => {
                tracing::info!(new_balance = %outcome.new_balance, "balance debited");
            }
            Ok(_) => {
                tracing::error!(
                    customer_id = %message.customer_id,
                    amount = %message.total_amount,
                    "order completed but debit was refused"
                );
                metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
            }
            Err(e) => {
                tracing::error!(error = %e, "order completed but debit failed");
                metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
            }
        }

        for item in &message.items {
            match self
                .inventory
                .decrement_stock(&item.item_id, item.quantity)
                .await
            {
                Ok(decrement) if decrement.ok => {
                    tracing::info!(
                        item_id = %item.item_id,
                        new_quantity = decrement.new_quantity,
                        "stock decremented"
                    );
                }
                Ok(_) => {
                    tracing::error!(
                        item_id = %item.item_id,
                        "order completed but stock decrement was refused"
                    );
                    metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
                }
                Err(e) => {
                    tracing::error!(
                        item_id = %item.item_id,
                        error = %e,
                        "order completed but stock decrement failed"
                    );
                    metrics::counter!("saga_ledger_inconsistencies_total").increment(1);
                }
            }
        }

        tracing::info!("order completed");
        Ok(())
    }
}

#[async_trait]
impl<O, B, I> MessageHandler for CompletionHandler<O, B, I>
where
    O: OrderStore,
    B: BalanceService,
    I: InventoryService,
{
    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), ConsumeError> {
        let message = super::decode(payload)?;
        CompletionHandler::handle(self, message)
            .await
            .map_err(super::abandon)
    }
}
