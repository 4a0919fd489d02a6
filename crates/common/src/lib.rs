//! Shared types used across the order validation system.

pub mod types;

pub use types::OrderId;
