//! Stock check stage.

use async_trait::async_trait;
use fabric::{topology, ConsumeError, FabricPublisher, MessageHandler};

use crate::error::{Result, SagaError};
use crate::message::ValidationMessage;
use crate::services::InventoryService;

/// First saga stage: verifies every line item against the inventory.
///
/// This stage only reads. The actual decrement happens in completion, which
/// trades a time-of-check/time-of-use window for simplicity; the conditional
/// decrement there is what actually protects stock.
pub struct StockCheckHandler<I, P> {
    inventory: I,
    fabric: P,
}

impl<I, P> StockCheckHandler<I, P>
where
    I: InventoryService,
    P: FabricPublisher,
{
    /// Creates a new stock check handler.
    pub fn new(inventory: I, fabric: P) -> Self {
        Self { inventory, fabric }
    }

    /// Checks stock for every line and routes the message onward.
    ///
    /// Per-line policy, in order of precedence: unknown item, unavailable
    /// item, insufficient quantity. The stage result is the AND over all
    /// lines; any single failure fails the whole check.
    #[tracing::instrument(skip(self, message), fields(order_id = %message.order_id))]
    pub async fn handle(&self, mut message: ValidationMessage) -> Result<()> {
        metrics::counter!("saga_stock_checks_total").increment(1);

        let mut failures = Vec::new();

        for item in &message.items {
            match self.inventory.get_item(&item.item_id).await? {
                None => {
                    tracing::warn!(item_id = %item.item_id, "item not found");
                    failures.push(format!("item not found: {}", item.item_id));
                }
                Some(record) if !record.available => {
                    tracing::warn!(item_id = %item.item_id, "item unavailable");
                    failures.push(format!("item unavailable: {}", item.item_name));
                }
                Some(record) if record.quantity < item.quantity => {
                    tracing::warn!(
                        item_id = %item.item_id,
                        requested = item.quantity,
                        available = record.quantity,
                        "insufficient stock"
                    );
                    failures.push(format!(
                        "insufficient stock for {}: requested {}, available {}",
                        item.item_name, item.quantity, record.quantity
                    ));
                }
                Some(_) => {}
            }
        }

        let all_in_stock = failures.is_empty();
        for reason in failures {
            message.append_reason(reason);
        }
        message.stock_available = all_in_stock;

        let routing_key = if all_in_stock {
            topology::PAYMENT_VALIDATION_ROUTING_KEY
        } else {
            metrics::counter!("saga_stock_check_failures_total").increment(1);
            topology::ORDER_REJECTION_ROUTING_KEY
        };

        self.fabric
            .publish(topology::VALIDATION_EXCHANGE, routing_key, &message.to_bytes()?)
            .await
            .map_err(SagaError::from)?;

        tracing::info!(stock_available = all_in_stock, "stock check completed");
        Ok(())
    }
}

#[async_trait]
impl<I, P> MessageHandler for StockCheckHandler<I, P>
where
    I: InventoryService,
    P: FabricPublisher,
{
    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), ConsumeError> {
        let message = super::decode(payload)?;
        StockCheckHandler::handle(self, message)
            .await
            .map_err(super::abandon)
    }
}
