//! Collaborator interfaces consumed by the saga.
//!
//! The catalog, account balances, and order persistence are owned by other
//! services; the saga only sees them through these traits. The in-memory
//! implementations back the test suites.

pub mod balance;
pub mod inventory;
pub mod notify;
pub mod orders;

pub use balance::{BalanceService, DebitOutcome, InMemoryBalanceService};
pub use inventory::{InMemoryInventoryService, InventoryService, ItemRecord, StockDecrement};
pub use notify::{AdminNotifier, FabricNotifier, InMemoryNotifier};
pub use orders::{InMemoryOrderStore, OrderStore};
