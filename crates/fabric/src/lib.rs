//! Message fabric for the order validation saga.
//!
//! One direct exchange, four routing keys, one durable queue per key.
//! Delivery is at-least-once with no ordering across queues and no
//! deduplication; consumers must tolerate redelivery.
//!
//! Implementations:
//! - [`AmqpFabric`]: RabbitMQ via `lapin`
//! - [`InMemoryFabric`]: in-process queues for tests

pub mod amqp;
pub mod config;
pub mod error;
pub mod memory;
pub mod topology;

use async_trait::async_trait;

pub use amqp::AmqpFabric;
pub use config::FabricConfig;
pub use error::{ConsumeError, FabricError};
pub use memory::InMemoryFabric;

/// Result type for fabric operations.
pub type Result<T> = std::result::Result<T, FabricError>;

/// Publishes messages to the fabric.
///
/// Publishing is fire-and-forget from the saga's point of view: once the
/// broker confirms the publish, delivery to the bound queue is the broker's
/// responsibility.
#[async_trait]
pub trait FabricPublisher: Send + Sync {
    /// Publishes a payload to an exchange under a routing key.
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: FabricPublisher + ?Sized> FabricPublisher for std::sync::Arc<T> {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        (**self).publish(exchange, routing_key, payload).await
    }
}

/// Handler invoked for each delivery on a consumed queue.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes a single delivery.
    ///
    /// Returning [`ConsumeError::Abandoned`] requeues the delivery for the
    /// broker's redelivery policy; [`ConsumeError::Malformed`] drops it
    /// without requeueing.
    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), ConsumeError>;
}
