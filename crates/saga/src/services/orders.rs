//! Order store collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus};

use crate::error::SagaError;

/// Trait for the order persistence collaborator.
///
/// The store offers no native optimistic lock, so `save_if_status` provides
/// the compare-and-set the saga needs: terminal transitions are applied
/// through it, and a redelivered stage that lost the race observes `false`
/// and skips its side effects.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Loads an order by ID.
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>, SagaError>;

    /// Persists an order unconditionally.
    async fn save(&self, order: Order) -> Result<(), SagaError>;

    /// Persists an order only if the stored status still equals `expected`.
    ///
    /// Returns false (leaving the stored order untouched) when another
    /// writer got there first.
    async fn save_if_status(&self, order: Order, expected: OrderStatus)
        -> Result<bool, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    unreachable: bool,
}

/// In-memory order store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored status of an order, if it exists.
    pub fn status_of(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.state
            .read()
            .unwrap()
            .orders
            .get(&order_id)
            .map(Order::status)
    }

    /// Simulates the collaborator being unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unwrap().unreachable = unreachable;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>, SagaError> {
        let state = self.state.read().unwrap();
        if state.unreachable {
            return Err(SagaError::OrderStore("order store unreachable".to_string()));
        }
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn save(&self, order: Order) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();
        if state.unreachable {
            return Err(SagaError::OrderStore("order store unreachable".to_string()));
        }
        state.orders.insert(order.id(), order);
        Ok(())
    }

    async fn save_if_status(
        &self,
        order: Order,
        expected: OrderStatus,
    ) -> Result<bool, SagaError> {
        let mut state = self.state.write().unwrap();
        if state.unreachable {
            return Err(SagaError::OrderStore("order store unreachable".to_string()));
        }

        let Some(stored) = state.orders.get(&order.id()) else {
            return Ok(false);
        };
        if stored.status() != expected {
            return Ok(false);
        }

        state.orders.insert(order.id(), order);
        Ok(true)
    }
}
