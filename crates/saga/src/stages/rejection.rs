//! Order rejection stage.

use async_trait::async_trait;
use fabric::{ConsumeError, MessageHandler};

use crate::error::{Result, SagaError};
use crate::message::ValidationMessage;
use crate::services::{AdminNotifier, OrderStore};

/// Terminal failure stage: marks the order rejected.
///
/// The payment status only moves to failed when the payment check itself
/// failed, which is the case exactly when stock was available but payment
/// did not validate. A stock-only failure never reaches the payment stage,
/// so its payment status stays untouched.
///
/// Like completion, the stage is guarded by the status compare-and-set:
/// redeliveries find the order already terminal and return without
/// touching it.
pub struct RejectionHandler<O, N> {
    orders: O,
    notifier: N,
}

impl<O, N> RejectionHandler<O, N>
where
    O: OrderStore,
    N: AdminNotifier,
{
    /// Creates a new rejection handler.
    pub fn new(orders: O, notifier: N) -> Self {
        Self { orders, notifier }
    }

    /// Marks the order rejected and alerts operators on payment failures.
    #[tracing::instrument(skip(self, message), fields(order_id = %message.order_id))]
    pub async fn handle(&self, message: ValidationMessage) -> Result<()> {
        metrics::counter!("saga_rejections_total").increment(1);

        let order = self
            .orders
            .load(message.order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(message.order_id))?;

        let previous_status = order.status();
        if previous_status.is_terminal() {
            tracing::info!(status = %previous_status, "order already terminal, skipping redelivery");
            metrics::counter!("saga_rejection_redeliveries_skipped_total").increment(1);
            return Ok(());
        }

        let payment_failed = message.stock_available && !message.payment_validated;

        let mut rejected = order;
        rejected.reject(payment_failed)?;

        if !self.orders.save_if_status(rejected, previous_status).await? {
            tracing::info!("lost rejection race to a concurrent delivery, skipping");
            metrics::counter!("saga_rejection_redeliveries_skipped_total").increment(1);
            return Ok(());
        }

        if payment_failed {
            tracing::error!(reason = %message.validation_message, "order rejected: payment failed");
            if let Err(e) = self
                .notifier
                .payment_failed(message.order_id, &message.validation_message)
                .await
            {
                tracing::error!(error = %e, "failed to send admin notification");
            }
        } else {
            tracing::warn!(reason = %message.validation_message, "order rejected: out of stock");
        }

        Ok(())
    }
}

#[async_trait]
impl<O, N> MessageHandler for RejectionHandler<O, N>
where
    O: OrderStore,
    N: AdminNotifier,
{
    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), ConsumeError> {
        let message = super::decode(payload)?;
        RejectionHandler::handle(self, message)
            .await
            .map_err(super::abandon)
    }
}
