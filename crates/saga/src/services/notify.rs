//! Admin notification channel.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use fabric::{topology, FabricPublisher};

use crate::error::SagaError;

/// Trait for the operator-facing alert channel.
///
/// Notification delivery is best effort: stages log a failed notification
/// and carry on, since an alert must never decide an order's fate.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// Emits a payment failure alert for an order.
    async fn payment_failed(&self, order_id: OrderId, reason: &str) -> Result<(), SagaError>;
}

/// Notifier that publishes alerts to the payment exchange on the fabric.
#[derive(Debug, Clone)]
pub struct FabricNotifier<P> {
    fabric: P,
}

impl<P: FabricPublisher> FabricNotifier<P> {
    /// Creates a new fabric-backed notifier.
    pub fn new(fabric: P) -> Self {
        Self { fabric }
    }
}

#[async_trait]
impl<P: FabricPublisher> AdminNotifier for FabricNotifier<P> {
    async fn payment_failed(&self, order_id: OrderId, reason: &str) -> Result<(), SagaError> {
        let alert = format!("order {order_id} payment failed: {reason}");
        self.fabric
            .publish(
                topology::PAYMENT_EXCHANGE,
                topology::PAYMENT_FAILED_ROUTING_KEY,
                alert.as_bytes(),
            )
            .await?;
        Ok(())
    }
}

/// In-memory notifier recording alerts for assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    alerts: Arc<RwLock<Vec<String>>>,
}

impl InMemoryNotifier {
    /// Creates a new empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded alerts.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.read().unwrap().clone()
    }
}

#[async_trait]
impl AdminNotifier for InMemoryNotifier {
    async fn payment_failed(&self, order_id: OrderId, reason: &str) -> Result<(), SagaError> {
        self.alerts
            .write()
            .unwrap()
            .push(format!("order {order_id} payment failed: {reason}"));
        Ok(())
    }
}
