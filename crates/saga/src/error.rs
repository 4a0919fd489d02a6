//! Saga error types.
//!
//! Validation failures are never errors: they route the order to rejection
//! through the message flow. Errors here mean a collaborator or the fabric
//! could not be reached, or state was inconsistent.

use common::OrderId;
use domain::OrderError;
use fabric::FabricError;
use thiserror::Error;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Order not found in the order store.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Inventory collaborator unreachable or failed.
    #[error("inventory collaborator error: {0}")]
    Inventory(String),

    /// Balance collaborator unreachable or failed.
    #[error("balance collaborator error: {0}")]
    Balance(String),

    /// Order store unreachable or failed.
    #[error("order store error: {0}")]
    OrderStore(String),

    /// Message fabric error.
    #[error("fabric error: {0}")]
    Fabric(#[from] FabricError),

    /// Order state machine violation.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
