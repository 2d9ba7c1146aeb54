//! Orders domain module.
//!
//! This crate contains the business rules for order placement requests, the
//! persisted order/item shapes, and the order status workflow, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod placement;
pub mod status;

pub use order::{MAX_LINE_QUANTITY, NewOrder, Order, OrderDetails, OrderItem, OrderLine};
pub use placement::{PaymentMethod, PlaceOrder};
pub use status::{OrderStatus, TransitionKind};
