//! AMQP (RabbitMQ) fabric implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use deadpool_lapin::{Manager, Pool, PoolError};
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    BasicRejectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, ExchangeKind};
use tracing::{debug, error, info, warn};

use crate::config::FabricConfig;
use crate::error::{ConsumeError, FabricError};
use crate::{topology, FabricPublisher, MessageHandler, Result};

const PUBLISH_MAX_RETRIES: usize = 5;

/// RabbitMQ-backed message fabric.
///
/// Connecting declares the full topology up front: the validation exchange
/// with its four queue bindings, and the admin notification exchange.
/// The constructor fails fast when the broker is unreachable, so callers
/// can fall back to the synchronous validation path.
pub struct AmqpFabric {
    pool: Pool,
}

impl AmqpFabric {
    /// Connects to the broker and declares the saga topology.
    pub async fn connect(config: &FabricConfig) -> Result<Self> {
        let manager = Manager::new(config.url(), Default::default());
        let pool = Pool::builder(manager)
            .max_size(10)
            .build()
            .map_err(|e| FabricError::Connection(format!("failed to create pool: {e}")))?;

        // Fail fast instead of hanging on an unreachable broker.
        let conn = tokio::time::timeout(config.connect_timeout, pool.get())
            .await
            .map_err(|_| {
                FabricError::Connection(format!(
                    "connect to {}:{} timed out after {:?}",
                    config.host, config.port, config.connect_timeout
                ))
            })?
            .map_err(|e| FabricError::Connection(format!("failed to connect: {e}")))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| FabricError::Connection(format!("failed to create channel: {e}")))?;

        Self::declare_topology(&channel).await?;

        info!(host = %config.host, port = config.port, "connected to message fabric");

        Ok(Self { pool })
    }

    /// Declares exchanges, queues, and bindings for the saga.
    async fn declare_topology(channel: &Channel) -> Result<()> {
        let durable = ExchangeDeclareOptions {
            durable: true,
            ..Default::default()
        };

        channel
            .exchange_declare(
                topology::VALIDATION_EXCHANGE,
                ExchangeKind::Direct,
                durable,
                FieldTable::default(),
            )
            .await
            .map_err(|e| FabricError::Connection(format!("failed to declare exchange: {e}")))?;

        for (queue, routing_key) in topology::validation_bindings() {
            Self::declare_and_bind(channel, topology::VALIDATION_EXCHANGE, queue, routing_key)
                .await?;
        }

        channel
            .exchange_declare(
                topology::PAYMENT_EXCHANGE,
                ExchangeKind::Direct,
                durable,
                FieldTable::default(),
            )
            .await
            .map_err(|e| FabricError::Connection(format!("failed to declare exchange: {e}")))?;

        Self::declare_and_bind(
            channel,
            topology::PAYMENT_EXCHANGE,
            topology::ADMIN_PAYMENT_QUEUE,
            topology::PAYMENT_FAILED_ROUTING_KEY,
        )
        .await?;

        Ok(())
    }

    async fn declare_and_bind(
        channel: &Channel,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<()> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FabricError::Connection(format!("failed to declare queue: {e}")))?;

        channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| FabricError::Connection(format!("failed to bind queue: {e}")))?;

        debug!(queue, exchange, routing_key, "bound queue");
        Ok(())
    }

    async fn get_channel(&self) -> Result<Channel> {
        let conn = self.pool.get().await.map_err(|e: PoolError| {
            FabricError::Connection(format!("failed to get connection from pool: {e}"))
        })?;

        conn.create_channel()
            .await
            .map_err(|e| FabricError::Connection(format!("failed to create channel: {e}")))
    }

    /// Starts consuming a queue, dispatching each delivery to the handler.
    ///
    /// Spawns a background task that reconnects with exponential backoff
    /// when the broker connection drops.
    pub fn consume(&self, queue: &str, handler: Arc<dyn MessageHandler>) {
        let pool = self.pool.clone();
        let queue = queue.to_string();

        tokio::spawn(async move {
            Self::consume_with_reconnect(pool, queue, handler).await;
        });
    }

    async fn consume_with_reconnect(pool: Pool, queue: String, handler: Arc<dyn MessageHandler>) {
        let backoff_builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(30))
            .with_jitter();

        let mut backoff = backoff_builder.build();

        loop {
            match Self::setup_consumer(&pool, &queue).await {
                Ok(mut consumer) => {
                    info!(queue = %queue, "consumer connected");
                    backoff = backoff_builder.build();

                    while let Some(delivery) = consumer.next().await {
                        match delivery {
                            Ok(delivery) => Self::settle(delivery, &handler).await,
                            Err(e) => {
                                error!(error = %e, queue = %queue, "delivery error, reconnecting");
                                break;
                            }
                        }
                    }

                    info!(queue = %queue, "consumer stream ended, reconnecting");
                }
                Err(e) => {
                    let delay = backoff.next().unwrap_or(Duration::from_secs(30));
                    error!(
                        error = %e,
                        queue = %queue,
                        backoff_ms = %delay.as_millis(),
                        "failed to set up consumer, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(30));
            tokio::time::sleep(delay).await;
        }
    }

    async fn setup_consumer(pool: &Pool, queue: &str) -> Result<lapin::Consumer> {
        let conn = pool.get().await.map_err(|e: PoolError| {
            FabricError::Connection(format!("failed to get connection from pool: {e}"))
        })?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| FabricError::Connection(format!("failed to create channel: {e}")))?;

        channel
            .basic_consume(
                queue,
                "saga-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| FabricError::Subscribe(format!("failed to start consumer: {e}")))
    }

    /// Acks, requeues, or drops a delivery based on the handler outcome.
    async fn settle(delivery: lapin::message::Delivery, handler: &Arc<dyn MessageHandler>) {
        match handler.handle(&delivery.data).await {
            Ok(()) => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!(error = %e, "failed to ack delivery");
                }
            }
            Err(ConsumeError::Abandoned(reason)) => {
                warn!(%reason, "delivery abandoned, requeueing");
                let requeue = BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                };
                if let Err(e) = delivery.nack(requeue).await {
                    error!(error = %e, "failed to nack delivery");
                }
            }
            Err(ConsumeError::Malformed(reason)) => {
                error!(%reason, "malformed delivery, dropping");
                if let Err(e) = delivery.reject(BasicRejectOptions::default()).await {
                    error!(error = %e, "failed to reject delivery");
                }
            }
        }
    }
}

#[async_trait]
impl FabricPublisher for AmqpFabric {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(PUBLISH_MAX_RETRIES)
            .with_jitter()
            .build();

        let mut last_error = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            // Fresh channel per attempt handles broker reconnection.
            let channel = match self.get_channel().await {
                Ok(ch) => ch,
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "failed to get channel, retrying");
                    last_error = Some(e);
                    continue;
                }
            };

            let properties = BasicProperties::default()
                .with_content_type("application/json".into())
                .with_delivery_mode(2); // persistent

            match channel
                .basic_publish(
                    exchange,
                    routing_key,
                    BasicPublishOptions::default(),
                    payload,
                    properties,
                )
                .await
            {
                Ok(confirm) => match confirm.await {
                    Ok(_) => {
                        debug!(exchange, routing_key, "published message");
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(attempt = attempt + 1, error = %e, "publish confirm failed, retrying");
                        last_error =
                            Some(FabricError::Publish(format!("confirmation failed: {e}")));
                    }
                },
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "publish failed, retrying");
                    last_error = Some(FabricError::Publish(format!("failed to publish: {e}")));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FabricError::Publish("max retries exceeded".to_string())))
    }
}
