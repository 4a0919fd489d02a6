//! End-to-end saga flows over the in-memory fabric.
//!
//! The tests pump the fabric queues by hand: each pop-and-handle is one
//! delivery, and popping the same payload into a handler twice simulates
//! the broker's at-least-once redelivery.

use domain::{CustomerId, Money, Order, OrderLine, OrderStatus, PaymentStatus};
use fabric::{topology, InMemoryFabric, MessageHandler};
use saga::services::{
    InMemoryBalanceService, InMemoryInventoryService, InMemoryNotifier, InMemoryOrderStore,
    OrderStore,
};
use saga::{
    CompletionHandler, PaymentValidationHandler, RejectionHandler, SagaCoordinator,
    StockCheckHandler,
};

struct Harness {
    fabric: InMemoryFabric,
    orders: InMemoryOrderStore,
    balance: InMemoryBalanceService,
    inventory: InMemoryInventoryService,
    notifier: InMemoryNotifier,
    coordinator: SagaCoordinator<InMemoryOrderStore, InMemoryBalanceService, InMemoryFabric>,
    stock_check: StockCheckHandler<InMemoryInventoryService, InMemoryFabric>,
    payment:
        PaymentValidationHandler<InMemoryBalanceService, InMemoryFabric, InMemoryNotifier>,
    completion:
        CompletionHandler<InMemoryOrderStore, InMemoryBalanceService, InMemoryInventoryService>,
    rejection: RejectionHandler<InMemoryOrderStore, InMemoryNotifier>,
}

impl Harness {
    fn new() -> Self {
        let fabric = InMemoryFabric::new();
        let orders = InMemoryOrderStore::new();
        let balance = InMemoryBalanceService::new();
        let inventory = InMemoryInventoryService::new();
        let notifier = InMemoryNotifier::new();
        let minimum = Money::from_dollars(10);

        Self {
            coordinator: SagaCoordinator::new(
                orders.clone(),
                balance.clone(),
                fabric.clone(),
                minimum,
            ),
            stock_check: StockCheckHandler::new(inventory.clone(), fabric.clone()),
            payment: PaymentValidationHandler::new(
                balance.clone(),
                fabric.clone(),
                notifier.clone(),
                minimum,
            ),
            completion: CompletionHandler::new(
                orders.clone(),
                balance.clone(),
                inventory.clone(),
            ),
            rejection: RejectionHandler::new(orders.clone(), notifier.clone()),
            fabric,
            orders,
            balance,
            inventory,
            notifier,
        }
    }

    /// Delivers queued messages to their stage handlers until the fabric
    /// drains. Panics if a handler fails, since these flows never abandon.
    async fn pump(&self) {
        loop {
            let mut delivered = false;
            for (routing_key, handler) in self.handlers() {
                while let Some(payload) = self.fabric.pop(topology::VALIDATION_EXCHANGE, routing_key)
                {
                    handler.handle(&payload).await.expect("stage handled");
                    delivered = true;
                }
            }
            if !delivered {
                break;
            }
        }
    }

    fn handlers(&self) -> [(&'static str, &dyn MessageHandler); 4] {
        [
            (topology::STOCK_CHECK_ROUTING_KEY, &self.stock_check),
            (topology::PAYMENT_VALIDATION_ROUTING_KEY, &self.payment),
            (topology::ORDER_COMPLETION_ROUTING_KEY, &self.completion),
            (topology::ORDER_REJECTION_ROUTING_KEY, &self.rejection),
        ]
    }

    async fn submit(&self, order: &Order) {
        self.coordinator
            .start_validation(order.clone())
            .await
            .expect("order submitted");
    }

    fn order_status(&self, order: &Order) -> OrderStatus {
        self.orders.status_of(order.id()).expect("order stored")
    }
}

fn single_line_order(unit_cents: i64, quantity: u32) -> Order {
    Order::new(
        CustomerId::new(),
        vec![OrderLine::new("ITEM-001", "Widget", Money::from_cents(unit_cents), quantity)
            .unwrap()],
    )
    .unwrap()
}

#[tokio::test]
async fn test_happy_path_completes_debits_and_decrements() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 5, true);

    let order = single_line_order(400, 4); // $16.00
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;
    h.pump().await;

    let stored = h.orders.load(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Completed);
    assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(3400))
    );
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(1));
    assert_eq!(h.inventory.is_available(&"ITEM-001".into()), Some(true));
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_insufficient_stock_rejects_without_touching_payment() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 3, true);

    let order = single_line_order(400, 5); // wants 5, only 3 in stock
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;
    h.pump().await;

    let stored = h.orders.load(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Rejected);
    // Stock failure short-circuits before payment: status stays unpaid.
    assert_eq!(stored.payment_status(), PaymentStatus::Unpaid);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(5000))
    );
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(3));
}

#[tokio::test]
async fn test_below_minimum_charge_rejects_with_failed_payment() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 10, true);

    let order = single_line_order(300, 2); // $6.00 < $10.00 minimum
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;
    h.pump().await;

    let stored = h.orders.load(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Rejected);
    assert_eq!(stored.payment_status(), PaymentStatus::Failed);
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(10));
    // One alert from payment validation, one summary from rejection.
    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.contains("below minimum")));
}

#[tokio::test]
async fn test_insufficient_balance_rejects_and_alerts() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 10, true);

    let order = single_line_order(400, 4); // $16.00
    h.balance.set_balance(order.customer_id(), Money::from_cents(1000)); // $10.00

    h.submit(&order).await;
    h.pump().await;

    let stored = h.orders.load(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Rejected);
    assert_eq!(stored.payment_status(), PaymentStatus::Failed);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(1000))
    );
    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.contains("insufficient balance")));
}

#[tokio::test]
async fn test_redelivered_completion_charges_exactly_once() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 5, true);

    let order = single_line_order(400, 4);
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;

    // Run stock check and payment validation normally.
    let payload = h
        .fabric
        .pop(topology::VALIDATION_EXCHANGE, topology::STOCK_CHECK_ROUTING_KEY)
        .unwrap();
    MessageHandler::handle(&h.stock_check, &payload).await.unwrap();
    let payload = h
        .fabric
        .pop(topology::VALIDATION_EXCHANGE, topology::PAYMENT_VALIDATION_ROUTING_KEY)
        .unwrap();
    MessageHandler::handle(&h.payment, &payload).await.unwrap();

    // Deliver the completion message twice, as an at-least-once broker may.
    let payload = h
        .fabric
        .pop(topology::VALIDATION_EXCHANGE, topology::ORDER_COMPLETION_ROUTING_KEY)
        .unwrap();
    MessageHandler::handle(&h.completion, &payload).await.unwrap();
    MessageHandler::handle(&h.completion, &payload).await.unwrap();

    assert_eq!(h.order_status(&order), OrderStatus::Completed);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(3400))
    );
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(1));
}

#[tokio::test]
async fn test_two_orders_race_for_the_last_units() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 5, true);

    // Both orders pass the read-only stock check against quantity 5, but
    // only one conditional decrement at completion can win.
    let first = single_line_order(400, 4);
    let second = single_line_order(400, 4);
    h.balance.set_balance(first.customer_id(), Money::from_cents(5000));
    h.balance.set_balance(second.customer_id(), Money::from_cents(5000));

    h.submit(&first).await;
    h.submit(&second).await;
    h.pump().await;

    // Both orders complete (the advisory check passed for each), but stock
    // never goes negative: the loser's decrement is refused and recorded.
    assert_eq!(h.order_status(&first), OrderStatus::Completed);
    assert_eq!(h.order_status(&second), OrderStatus::Completed);
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(1));
}

#[tokio::test]
async fn test_fabric_outage_falls_back_to_inline_validation() {
    let h = Harness::new();
    h.fabric.set_fail_publish(true);

    let order = single_line_order(400, 4); // $16.00
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;

    // No pump needed: the order settles inline, and the degraded path never
    // consults stock.
    let stored = h.orders.load(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Completed);
    assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(3400))
    );
}

#[tokio::test]
async fn test_cancel_before_pump_wins_and_blocks_completion() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 5, true);

    let order = single_line_order(400, 4);
    h.balance.set_balance(order.customer_id(), Money::from_cents(5000));

    h.submit(&order).await;
    let cancelled = h.coordinator.cancel_order(order.id()).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);

    // The in-flight messages still arrive; the terminal guard drops them.
    h.pump().await;

    assert_eq!(h.order_status(&order), OrderStatus::Cancelled);
    assert_eq!(
        h.balance.balance_of(order.customer_id()),
        Some(Money::from_cents(5000))
    );
    assert_eq!(h.inventory.quantity_of(&"ITEM-001".into()), Some(5));
}

#[tokio::test]
async fn test_multiple_failure_reasons_accumulate_in_the_alert() {
    let h = Harness::new();
    h.inventory.stock("ITEM-001", 10, true);

    let order = single_line_order(300, 2); // $6.00, below minimum
    h.balance.set_balance(order.customer_id(), Money::from_cents(100)); // and broke

    h.submit(&order).await;
    h.pump().await;

    assert_eq!(h.order_status(&order), OrderStatus::Rejected);
    // Payment validation alerts once for the whole message, the rejection
    // stage once with the accumulated summary; both failed checks appear
    // in each.
    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.contains("below minimum")));
    assert!(alerts.iter().all(|a| a.contains("insufficient balance")));
}
