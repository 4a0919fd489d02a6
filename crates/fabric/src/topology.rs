//! Exchange, queue, and routing key names for the validation saga.
//!
//! One direct exchange with four routing keys, each bound to its own
//! durable queue. Every saga stage consumes exactly one queue.

/// Direct exchange carrying the in-flight validation messages.
pub const VALIDATION_EXCHANGE: &str = "order.validation";

/// Routing key for newly created orders entering the saga.
pub const STOCK_CHECK_ROUTING_KEY: &str = "order.stock.check";
/// Routing key for orders whose stock check passed.
pub const PAYMENT_VALIDATION_ROUTING_KEY: &str = "order.payment.validation";
/// Routing key for orders whose payment validation passed.
pub const ORDER_COMPLETION_ROUTING_KEY: &str = "order.completion";
/// Routing key for orders failed by any stage.
pub const ORDER_REJECTION_ROUTING_KEY: &str = "order.rejection";

/// Queue consumed by the stock check stage.
pub const STOCK_CHECK_QUEUE: &str = "stock-check";
/// Queue consumed by the payment validation stage.
pub const PAYMENT_VALIDATION_QUEUE: &str = "payment-validation";
/// Queue consumed by the order completion stage.
pub const ORDER_COMPLETION_QUEUE: &str = "order-completion";
/// Queue consumed by the order rejection stage.
pub const ORDER_REJECTION_QUEUE: &str = "order-rejection";

/// Direct exchange for operator-facing alerts.
pub const PAYMENT_EXCHANGE: &str = "payment";
/// Routing key for payment failure alerts.
pub const PAYMENT_FAILED_ROUTING_KEY: &str = "payment.failed";
/// Queue delivering payment failure alerts to the admin channel.
pub const ADMIN_PAYMENT_QUEUE: &str = "admin-payment-notification";

/// (queue, routing key) bindings on the validation exchange.
pub fn validation_bindings() -> [(&'static str, &'static str); 4] {
    [
        (STOCK_CHECK_QUEUE, STOCK_CHECK_ROUTING_KEY),
        (PAYMENT_VALIDATION_QUEUE, PAYMENT_VALIDATION_ROUTING_KEY),
        (ORDER_COMPLETION_QUEUE, ORDER_COMPLETION_ROUTING_KEY),
        (ORDER_REJECTION_QUEUE, ORDER_REJECTION_ROUTING_KEY),
    ]
}
