//! Infrastructure layer: storage backends, order placement, config.

pub mod config;
pub mod error;
pub mod notify;
pub mod placement;
pub mod service;
pub mod store;


pub use config::{Backend, ConfigError, Settings};
pub use error::OrderServiceError;
pub use notify::{BroadcastPaymentNotifier, LogPaymentNotifier, PaymentInitiation, PaymentNotifier};
pub use placement::PlacementCoordinator;
pub use service::{InMemoryOrderService, OrderOperations, OrderService, PostgresOrderService};
