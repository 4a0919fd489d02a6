//! Saga entry points.

use domain::{Money, Order, OrderError};
use fabric::{topology, FabricPublisher};

use crate::direct::DirectValidator;
use crate::error::{Result, SagaError};
use crate::message::ValidationMessage;
use crate::services::{BalanceService, OrderStore};

/// Front door of the validation saga.
///
/// Starts validation for new orders by publishing the initial message to the
/// stock check queue, falling back to inline validation when the fabric is
/// unreachable, and handles cancellation requests against the order store.
pub struct SagaCoordinator<O, B, P> {
    orders: O,
    fabric: P,
    fallback: DirectValidator<O, B>,
}

impl<O, B, P> SagaCoordinator<O, B, P>
where
    O: OrderStore + Clone,
    B: BalanceService,
    P: FabricPublisher,
{
    /// Creates a new coordinator.
    pub fn new(orders: O, balance: B, fabric: P, minimum_charge: Money) -> Self {
        let fallback = DirectValidator::new(orders.clone(), balance, minimum_charge);
        Self {
            orders,
            fabric,
            fallback,
        }
    }

    /// Persists a new order and kicks off its validation.
    ///
    /// The order is saved pending before anything is published, so a crash
    /// between save and publish leaves a pending order that an operator can
    /// resubmit, never a validated-but-unsaved one.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn start_validation(&self, order: Order) -> Result<()> {
        metrics::counter!("saga_orders_submitted_total").increment(1);

        self.orders.save(order.clone()).await?;

        let message = ValidationMessage::from_order(&order);
        match self
            .fabric
            .publish(
                topology::VALIDATION_EXCHANGE,
                topology::STOCK_CHECK_ROUTING_KEY,
                &message.to_bytes()?,
            )
            .await
        {
            Ok(()) => {
                tracing::info!("order submitted for validation");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "fabric unavailable, validating inline");
                metrics::counter!("saga_direct_fallbacks_total").increment(1);
                let status = self.fallback.validate_and_complete(order).await?;
                tracing::info!(status = %status, "inline validation settled the order");
                Ok(())
            }
        }
    }

    /// Cancels an order that has not reached a terminal state.
    ///
    /// Returns the cancelled order, or a state conflict when the order is
    /// already completed, rejected, or cancelled, including when a terminal
    /// stage wins the race against the cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: common::OrderId) -> Result<Order> {
        let order = self
            .orders
            .load(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))?;

        let previous_status = order.status();
        let mut cancelled = order;
        cancelled.cancel()?;

        if self
            .orders
            .save_if_status(cancelled.clone(), previous_status)
            .await?
        {
            tracing::info!("order cancelled");
            return Ok(cancelled);
        }

        // A stage settled the order between our load and write.
        let current = self
            .orders
            .load(order_id)
            .await?
            .map(|o| o.status())
            .unwrap_or(previous_status);
        tracing::warn!(status = %current, "cancellation lost the race to a terminal stage");
        Err(SagaError::Order(OrderError::ConflictingState {
            current,
            action: "cancel",
        }))
    }
}
