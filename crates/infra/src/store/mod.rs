//! Transactional storage boundary for order placement.
//!
//! Placement touches three components (inventory ledger, order store, cart)
//! that must commit or roll back together. Each component trait is generic over
//! the backend's transaction handle, and a `UnitOfWork` opens/closes that
//! handle, so components stay separate while sharing one transactional scope.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryDatabase, MemoryCartStore, MemoryInventoryLedger, MemoryOrderStore, MemoryTx, MemoryUnitOfWork};
pub use postgres::{PgCartStore, PgDatabase, PgInventoryLedger, PgOrderStore, PgTx, PgUnitOfWork};
pub use r#trait::{CartStore, InventoryLedger, OrderStore, StoreError, UnitOfWork};
