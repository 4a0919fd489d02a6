//! Inventory collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::ItemId;

use crate::error::SagaError;

/// Per-item stock state as reported by the inventory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRecord {
    /// Available quantity, never negative.
    pub quantity: u32,
    /// Availability flag; forced false when quantity reaches zero.
    pub available: bool,
}

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    /// Quantity remaining after the decrement (unchanged when `ok` is false).
    pub new_quantity: u32,
    /// False when the decrement was refused for insufficient quantity.
    pub ok: bool,
}

/// Trait for the inventory collaborator.
///
/// The check-and-mutate in `decrement_stock` must be a single conditional
/// operation at the collaborator boundary; the saga never reads a quantity
/// and writes it back, so two orders racing for the last unit cannot both
/// win.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Looks up an item's stock record. `None` means the item is unknown.
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<ItemRecord>, SagaError>;

    /// Decrements stock by `quantity` if and only if enough is available.
    async fn decrement_stock(
        &self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<StockDecrement, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    items: HashMap<ItemId, ItemRecord>,
    unreachable: bool,
}

/// In-memory inventory collaborator for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets stock for an item.
    pub fn stock(&self, item_id: impl Into<ItemId>, quantity: u32, available: bool) {
        self.state.write().unwrap().items.insert(
            item_id.into(),
            ItemRecord {
                quantity,
                available,
            },
        );
    }

    /// Returns the current quantity for an item, if it exists.
    pub fn quantity_of(&self, item_id: &ItemId) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .items
            .get(item_id)
            .map(|record| record.quantity)
    }

    /// Returns the availability flag for an item, if it exists.
    pub fn is_available(&self, item_id: &ItemId) -> Option<bool> {
        self.state
            .read()
            .unwrap()
            .items
            .get(item_id)
            .map(|record| record.available)
    }

    /// Simulates the collaborator being unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unwrap().unreachable = unreachable;
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<ItemRecord>, SagaError> {
        let state = self.state.read().unwrap();
        if state.unreachable {
            return Err(SagaError::Inventory("inventory unreachable".to_string()));
        }
        Ok(state.items.get(item_id).copied())
    }

    async fn decrement_stock(
        &self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<StockDecrement, SagaError> {
        // Single lock over check and mutate: the conditional decrement is
        // atomic with respect to concurrent completions.
        let mut state = self.state.write().unwrap();
        if state.unreachable {
            return Err(SagaError::Inventory("inventory unreachable".to_string()));
        }

        let Some(record) = state.items.get_mut(item_id) else {
            return Ok(StockDecrement {
                new_quantity: 0,
                ok: false,
            });
        };

        if record.quantity < quantity {
            return Ok(StockDecrement {
                new_quantity: record.quantity,
                ok: false,
            });
        }

        record.quantity -= quantity;
        if record.quantity == 0 {
            record.available = false;
        }

        Ok(StockDecrement {
            new_quantity: record.quantity,
            ok: true,
        })
    }
}
