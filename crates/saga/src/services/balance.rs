//! Balance collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{CustomerId, Money};

use crate::error::SagaError;

/// Result of a conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitOutcome {
    /// Balance remaining after the debit (unchanged when `ok` is false).
    pub new_balance: Money,
    /// False when the debit was refused for insufficient funds.
    pub ok: bool,
}

/// Trait for the account balance collaborator.
///
/// A debit that would drive the balance below zero is rejected by the
/// collaborator itself, never pre-checked-then-written by the saga.
#[async_trait]
pub trait BalanceService: Send + Sync {
    /// Reads the current balance. `None` means the account is unknown.
    async fn get_balance(&self, customer_id: CustomerId) -> Result<Option<Money>, SagaError>;

    /// Debits the account by `amount` if and only if funds suffice.
    async fn debit(&self, customer_id: CustomerId, amount: Money)
        -> Result<DebitOutcome, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryBalanceState {
    balances: HashMap<CustomerId, Money>,
    unreachable: bool,
}

/// In-memory balance collaborator for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalanceService {
    state: Arc<RwLock<InMemoryBalanceState>>,
}

impl InMemoryBalanceService {
    /// Creates a new empty balance store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an account balance.
    pub fn set_balance(&self, customer_id: CustomerId, balance: Money) {
        self.state
            .write()
            .unwrap()
            .balances
            .insert(customer_id, balance);
    }

    /// Returns the current balance for an account, if it exists.
    pub fn balance_of(&self, customer_id: CustomerId) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .balances
            .get(&customer_id)
            .copied()
    }

    /// Simulates the collaborator being unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unwrap().unreachable = unreachable;
    }
}

#[async_trait]
impl BalanceService for InMemoryBalanceService {
    async fn get_balance(&self, customer_id: CustomerId) -> Result<Option<Money>, SagaError> {
        let state = self.state.read().unwrap();
        if state.unreachable {
            return Err(SagaError::Balance("balance service unreachable".to_string()));
        }
        Ok(state.balances.get(&customer_id).copied())
    }

    async fn debit(
        &self,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<DebitOutcome, SagaError> {
        // Single lock over check and mutate, same contract as the inventory
        // decrement.
        let mut state = self.state.write().unwrap();
        if state.unreachable {
            return Err(SagaError::Balance("balance service unreachable".to_string()));
        }

        let Some(balance) = state.balances.get_mut(&customer_id) else {
            return Ok(DebitOutcome {
                new_balance: Money::zero(),
                ok: false,
            });
        };

        if *balance < amount {
            return Ok(DebitOutcome {
                new_balance: *balance,
                ok: false,
            });
        }

        *balance -= amount;
        Ok(DebitOutcome {
            new_balance: *balance,
            ok: true,
        })
    }
}
