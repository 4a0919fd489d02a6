//! Saga stage handlers.
//!
//! One handler per stage, each a stateless consumer of its queue. Handlers
//! mutate the in-flight [`ValidationMessage`](crate::ValidationMessage) and
//! publish it to the next stage's routing key; the terminal stages write the
//! order's status through the order store's compare-and-set.
//!
//! Every handler tolerates redelivery: stock check and payment validation
//! are read-only, completion and rejection are guarded by the status
//! compare-and-set.

mod completion;
mod payment;
mod rejection;
mod stock_check;

pub use completion::CompletionHandler;
pub use payment::PaymentValidationHandler;
pub use rejection::RejectionHandler;
pub use stock_check::StockCheckHandler;

use fabric::ConsumeError;

use crate::error::SagaError;
use crate::message::ValidationMessage;

/// Decodes a delivery payload, classifying undecodable ones as malformed.
fn decode(payload: &[u8]) -> Result<ValidationMessage, ConsumeError> {
    ValidationMessage::from_bytes(payload).map_err(|e| ConsumeError::Malformed(e.to_string()))
}

/// Maps a stage failure to its delivery disposition.
///
/// Stage errors mean a collaborator or the fabric was unreachable; the
/// delivery is abandoned and left to the broker's redelivery policy rather
/// than deciding the order either way.
fn abandon(error: SagaError) -> ConsumeError {
    ConsumeError::Abandoned(error.to_string())
}
