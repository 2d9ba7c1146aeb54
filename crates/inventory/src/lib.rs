//! Inventory ledger domain module.
//!
//! This crate contains the business rules for per-product stock counters,
//! implemented purely as deterministic domain logic (no IO, no storage). The
//! storage backends in `storefront-infra` apply these rules inside a
//! transaction.

pub mod stock;

pub use stock::{InsufficientStock, StockLevel, StockReservation};
