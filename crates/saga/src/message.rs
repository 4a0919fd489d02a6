//! The in-flight validation message.

use common::OrderId;
use domain::{CustomerId, ItemId, Money, Order};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Snapshot of one order line carried through the saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInfo {
    /// The catalog item.
    pub item_id: ItemId,
    /// Item name snapshot for human-readable reasons.
    pub item_name: String,
    /// Quantity ordered.
    pub quantity: u32,
}

/// The serialized carrier of saga state between stages.
///
/// This is the sole channel through which stages communicate. It travels by
/// value through the fabric, so two in-flight copies of the same order's
/// message can exist under redelivery. Field names are part of the wire
/// contract and must stay stable across services.
///
/// Both flags start false; each is set exactly once by its owning stage, and
/// no later stage ever resets a false flag to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub items: Vec<LineItemInfo>,
    pub stock_available: bool,
    pub payment_validated: bool,
    /// Accumulated human-readable failure reasons, `"; "`-joined.
    pub validation_message: String,
}

impl ValidationMessage {
    /// Builds the initial message for a newly created order.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            customer_id: order.customer_id(),
            total_amount: order.total_amount(),
            items: order
                .lines()
                .iter()
                .map(|line| LineItemInfo {
                    item_id: line.item_id.clone(),
                    item_name: line.item_name.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            stock_available: false,
            payment_validated: false,
            validation_message: String::new(),
        }
    }

    /// Appends a failure reason to the accumulator.
    pub fn append_reason(&mut self, reason: impl AsRef<str>) {
        if !self.validation_message.is_empty() {
            self.validation_message.push_str("; ");
        }
        self.validation_message.push_str(reason.as_ref());
    }

    /// Serializes the message for the fabric.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a message received from the fabric.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
