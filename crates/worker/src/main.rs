//! Saga worker entry point.
//!
//! Connects to the message fabric, declares the saga topology, and consumes
//! the four stage queues until a shutdown signal arrives.

use std::sync::Arc;

use fabric::{topology, AmqpFabric};
use saga::services::{
    FabricNotifier, InMemoryBalanceService, InMemoryInventoryService, InMemoryOrderStore,
};
use saga::{
    CompletionHandler, PaymentValidationHandler, RejectionHandler, SagaConfig, StockCheckHandler,
};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics exporter
    let metrics_port: u16 = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9000);
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics_port))
        .install()
        .expect("failed to install Prometheus exporter");

    // 3. Load configuration and connect to the fabric
    let config = SagaConfig::from_env();
    let fabric = Arc::new(
        AmqpFabric::connect(&config.fabric)
            .await
            .expect("failed to connect to message fabric"),
    );

    // 4. Create collaborators. These in-memory stand-ins keep all state
    //    process-local; deployments back the traits with their own services.
    let orders = InMemoryOrderStore::new();
    let balance = InMemoryBalanceService::new();
    let inventory = InMemoryInventoryService::new();
    let notifier = FabricNotifier::new(fabric.clone());

    // 5. Wire one handler per stage queue
    fabric.consume(
        topology::STOCK_CHECK_QUEUE,
        Arc::new(StockCheckHandler::new(inventory.clone(), fabric.clone())),
    );
    fabric.consume(
        topology::PAYMENT_VALIDATION_QUEUE,
        Arc::new(PaymentValidationHandler::new(
            balance.clone(),
            fabric.clone(),
            notifier.clone(),
            config.minimum_charge,
        )),
    );
    fabric.consume(
        topology::ORDER_COMPLETION_QUEUE,
        Arc::new(CompletionHandler::new(
            orders.clone(),
            balance.clone(),
            inventory.clone(),
        )),
    );
    fabric.consume(
        topology::ORDER_REJECTION_QUEUE,
        Arc::new(RejectionHandler::new(orders, notifier)),
    );

    tracing::info!(
        minimum_charge = %config.minimum_charge,
        metrics_port,
        "saga worker started"
    );

    shutdown_signal().await;
    tracing::info!("worker shut down gracefully");
}
