//! In-memory fabric for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::FabricError;
use crate::{FabricPublisher, Result};

#[derive(Debug, Default)]
struct InMemoryState {
    queues: HashMap<(String, String), VecDeque<Vec<u8>>>,
    published: usize,
    fail_publish: bool,
}

/// In-memory message fabric keyed by (exchange, routing key).
///
/// Tests pump the queues themselves, which makes broker behavior explicit:
/// popping a payload and handing it to a handler is one delivery, popping
/// the same payload twice simulates at-least-once redelivery.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFabric {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryFabric {
    /// Creates a new empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures publishes to fail, simulating an unreachable broker.
    pub fn set_fail_publish(&self, fail: bool) {
        self.state.lock().unwrap().fail_publish = fail;
    }

    /// Pops the oldest payload published under (exchange, routing key).
    pub fn pop(&self, exchange: &str, routing_key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get_mut(&(exchange.to_string(), routing_key.to_string()))
            .and_then(VecDeque::pop_front)
    }

    /// Returns the number of queued payloads under (exchange, routing key).
    pub fn queue_len(&self, exchange: &str, routing_key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(&(exchange.to_string(), routing_key.to_string()))
            .map_or(0, VecDeque::len)
    }

    /// Returns the total number of successful publishes.
    pub fn published_count(&self) -> usize {
        self.state.lock().unwrap().published
    }
}

#[async_trait]
impl FabricPublisher for InMemoryFabric {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.fail_publish {
            return Err(FabricError::Connection(
                "in-memory fabric configured unreachable".to_string(),
            ));
        }

        state
            .queues
            .entry((exchange.to_string(), routing_key.to_string()))
            .or_default()
            .push_back(payload.to_vec());
        state.published += 1;

        Ok(())
    }
}
