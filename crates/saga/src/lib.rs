//! Order validation saga.
//!
//! Validates newly created orders through a chain of message-driven stages:
//! stock check, payment validation, then completion or rejection. Stages
//! communicate exclusively through the [`ValidationMessage`] travelling over
//! the fabric, so the saga survives any single stage crashing; the broker
//! redelivers and the terminal stages' compare-and-set keeps redeliveries
//! from double-charging.
//!
//! [`SagaCoordinator`] is the entry point: it persists a pending order,
//! publishes the initial message, and falls back to [`DirectValidator`]
//! inline validation when the fabric is down.

pub mod config;
pub mod coordinator;
pub mod direct;
pub mod error;
pub mod message;
pub mod services;
pub mod stages;

pub use config::SagaConfig;
pub use coordinator::SagaCoordinator;
pub use direct::DirectValidator;
pub use error::{Result, SagaError};
pub use message::{LineItemInfo, ValidationMessage};
pub use stages::{
    CompletionHandler, PaymentValidationHandler, RejectionHandler, StockCheckHandler,
};
