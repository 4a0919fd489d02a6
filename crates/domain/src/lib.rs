//! Domain layer for the order validation saga.
//!
//! This crate provides the Order aggregate and its state machines:
//! - `OrderStatus` / `PaymentStatus` with guarded transitions
//! - `OrderLine` with price/subtotal frozen at order time
//! - `Money` as a fixed-point cents amount (never floating point)

pub mod order;

pub use order::{
    CustomerId, ItemId, Money, Order, OrderError, OrderLine, OrderStatus, PaymentStatus,
};
