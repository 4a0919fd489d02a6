//! Fabric error types.

use thiserror::Error;

/// Errors that can occur during fabric operations.
#[derive(Debug, Error)]
pub enum FabricError {
    /// Connection to the broker failed or timed out.
    #[error("fabric connection failed: {0}")]
    Connection(String),

    /// Publishing a message failed after retries.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Setting up a consumer failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// Outcome of a failed delivery, deciding its fate on the queue.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The payload could not be decoded; the delivery is dropped without
    /// requeueing, since redelivering it can never succeed.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The handler could not complete (e.g. a collaborator was unreachable);
    /// the delivery is requeued and left to the broker's redelivery policy.
    #[error("delivery abandoned: {0}")]
    Abandoned(String),
}
