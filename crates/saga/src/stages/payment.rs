//! Payment validation stage.

use async_trait::async_trait;
use domain::Money;
use fabric::{topology, ConsumeError, FabricPublisher, MessageHandler};

use crate::error::{Result, SagaError};
use crate::message::ValidationMessage;
use crate::services::{AdminNotifier, BalanceService};

/// Second saga stage: verifies the order amount and the customer's balance.
///
/// Read-only against the balance collaborator; the debit happens in
/// completion. Every failed check appends a reason; a single admin alert
/// per message carries all of them, so operators see one alert from this
/// stage no matter how many checks failed.
pub struct PaymentValidationHandler<B, P, N> {
    balance: B,
    fabric: P,
    notifier: N,
    minimum_charge: Money,
}

impl<B, P, N> PaymentValidationHandler<B, P, N>
where
    B: BalanceService,
    P: FabricPublisher,
    N: AdminNotifier,
{
    /// Creates a new payment validation handler.
    pub fn new(balance: B, fabric: P, notifier: N, minimum_charge: Money) -> Self {
        Self {
            balance,
            fabric,
            notifier,
            minimum_charge,
        }
    }

    /// Validates the payment and routes the message onward.
    #[tracing::instrument(skip(self, message), fields(order_id = %message.order_id))]
    pub async fn handle(&self, mut message: ValidationMessage) -> Result<()> {
        metrics::counter!("saga_payment_validations_total").increment(1);

        let mut failures = Vec::new();

        if message.total_amount < self.minimum_charge {
            tracing::warn!(
                total = %message.total_amount,
                minimum = %self.minimum_charge,
                "order amount below minimum charge"
            );
            failures.push(format!(
                "order amount {} is below minimum charge of {}",
                message.total_amount, self.minimum_charge
            ));
        }

        match self.balance.get_balance(message.customer_id).await? {
            None => {
                tracing::warn!(customer_id = %message.customer_id, "unknown customer account");
                failures.push("could not validate customer balance".to_string());
            }
            Some(balance) if balance < message.total_amount => {
                tracing::warn!(
                    customer_id = %message.customer_id,
                    balance = %balance,
                    total = %message.total_amount,
                    "insufficient balance"
                );
                failures.push(format!(
                    "insufficient balance: account has {} but the order requires {}",
                    balance, message.total_amount
                ));
            }
            Some(_) => {}
        }

        let payment_valid = failures.is_empty();
        if !payment_valid {
            metrics::counter!("saga_payment_validation_failures_total").increment(1);
            let reason = failures.join("; ");
            self.alert(&message, &reason).await;
            message.append_reason(reason);
        }
        message.payment_validated = payment_valid;

        let routing_key = if payment_valid {
            topology::ORDER_COMPLETION_ROUTING_KEY
        } else {
            topology::ORDER_REJECTION_ROUTING_KEY
        };

        self.fabric
            .publish(topology::VALIDATION_EXCHANGE, routing_key, &message.to_bytes()?)
            .await
            .map_err(SagaError::from)?;

        tracing::info!(payment_validated = payment_valid, "payment validation completed");
        Ok(())
    }

    /// Raises an admin alert, logging instead of failing the stage when the
    /// alert channel itself is down.
    async fn alert(&self, message: &ValidationMessage, reason: &str) {
        if let Err(e) = self.notifier.payment_failed(message.order_id, reason).await {
            tracing::error!(error = %e, "failed to send admin notification");
        }
    }
}

#[async_trait]
impl<B, P, N> MessageHandler for PaymentValidationHandler<B, P, N>
where
    B: BalanceService,
    P: FabricPublisher,
    N: AdminNotifier,
{
    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), ConsumeError> {
        let message = super::decode(payload)?;
        PaymentValidationHandler::handle(self, message)
            .await
            .map_err(super::abandon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryBalanceService, InMemoryNotifier};
    use domain::{CustomerId, Order, OrderLine};
    use fabric::InMemoryFabric;

    fn message_with_total(unit_cents: i64, quantity: u32) -> ValidationMessage {
        let order = Order::new(
            CustomerId::new(),
            vec![OrderLine::new("ITEM-001", "Widget", Money::from_cents(unit_cents), quantity)
                .unwrap()],
        )
        .unwrap();
        let mut message = ValidationMessage::from_order(&order);
        message.stock_available = true;
        message
    }

    fn next_message(fabric: &InMemoryFabric, routing_key: &str) -> ValidationMessage {
        let payload = fabric
            .pop(topology::VALIDATION_EXCHANGE, routing_key)
            .expect("message routed");
        ValidationMessage::from_bytes(&payload).unwrap()
    }

    fn handler(
        balance: InMemoryBalanceService,
        fabric: InMemoryFabric,
        notifier: InMemoryNotifier,
    ) -> PaymentValidationHandler<InMemoryBalanceService, InMemoryFabric, InMemoryNotifier> {
        PaymentValidationHandler::new(balance, fabric, notifier, Money::from_dollars(10))
    }

    #[tokio::test]
    async fn test_valid_payment_routes_to_completion() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(400, 4); // $16.00
        balance.set_balance(message.customer_id, Money::from_cents(5000));

        handler(balance, fabric.clone(), notifier.clone())
            .handle(message)
            .await
            .unwrap();

        let routed = next_message(&fabric, topology::ORDER_COMPLETION_ROUTING_KEY);
        assert!(routed.payment_validated);
        assert!(notifier.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_below_minimum_charge_rejects_and_alerts() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(500, 1); // $5.00 < $10.00
        balance.set_balance(message.customer_id, Money::from_cents(10000));

        handler(balance, fabric.clone(), notifier.clone())
            .handle(message)
            .await
            .unwrap();

        let routed = next_message(&fabric, topology::ORDER_REJECTION_ROUTING_KEY);
        assert!(!routed.payment_validated);
        assert!(routed.validation_message.contains("below minimum"));
        assert_eq!(notifier.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejects_with_amounts() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(400, 4); // $16.00
        balance.set_balance(message.customer_id, Money::from_cents(1000));

        handler(balance, fabric.clone(), notifier.clone())
            .handle(message)
            .await
            .unwrap();

        let routed = next_message(&fabric, topology::ORDER_REJECTION_ROUTING_KEY);
        assert!(!routed.payment_validated);
        assert!(routed
            .validation_message
            .contains("account has $10.00 but the order requires $16.00"));
        assert_eq!(notifier.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_rejects() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(400, 4);

        handler(balance, fabric.clone(), notifier.clone())
            .handle(message)
            .await
            .unwrap();

        let routed = next_message(&fabric, topology::ORDER_REJECTION_ROUTING_KEY);
        assert!(!routed.payment_validated);
        assert!(routed.validation_message.contains("could not validate"));
    }

    #[tokio::test]
    async fn test_both_checks_fail_raises_one_alert_with_both_reasons() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(500, 1); // $5.00, below minimum
        balance.set_balance(message.customer_id, Money::from_cents(100)); // and broke

        handler(balance, fabric.clone(), notifier.clone())
            .handle(message)
            .await
            .unwrap();

        let routed = next_message(&fabric, topology::ORDER_REJECTION_ROUTING_KEY);
        assert!(routed.validation_message.contains("below minimum"));
        assert!(routed.validation_message.contains("insufficient balance"));

        // One alert per message, carrying every failed check.
        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("below minimum"));
        assert!(alerts[0].contains("insufficient balance"));
    }

    #[tokio::test]
    async fn test_unreachable_balance_abandons_the_delivery() {
        let balance = InMemoryBalanceService::new();
        balance.set_unreachable(true);
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(400, 4);
        let result = handler(balance, fabric.clone(), notifier)
            .handle(message)
            .await;

        assert!(matches!(result, Err(SagaError::Balance(_))));
        assert_eq!(fabric.published_count(), 0);
    }

    #[tokio::test]
    async fn test_read_only_stage_does_not_debit() {
        let balance = InMemoryBalanceService::new();
        let fabric = InMemoryFabric::new();
        let notifier = InMemoryNotifier::new();

        let message = message_with_total(400, 4);
        let customer = message.customer_id;
        balance.set_balance(customer, Money::from_cents(5000));

        handler(balance.clone(), fabric, notifier)
            .handle(message)
            .await
            .unwrap();

        assert_eq!(balance.balance_of(customer), Some(Money::from_cents(5000)));
    }
}
