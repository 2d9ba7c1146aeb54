use async_trait::async_trait;
use thiserror::Error;

use storefront_core::{OrderId, ProductId, UserId};
use storefront_inventory::{InsufficientStock, StockLevel, StockReservation};
use storefront_orders::{NewOrder, Order, OrderItem, OrderStatus};

/// Storage operation error.
///
/// `NotFound` and `InsufficientStock` are expected business outcomes; the
/// remaining variants are infrastructure failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    /// A stored value could not be mapped back into the domain.
    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn order_not_found(id: OrderId) -> Self {
        Self::NotFound {
            entity: "order",
            id: id.get(),
        }
    }

    pub fn product_not_found(id: ProductId) -> Self {
        Self::NotFound {
            entity: "product",
            id: id.get(),
        }
    }
}

/// Opens and closes the transactional scope shared by the placement
/// components.
///
/// Dropping a `Tx` without committing must discard every change made through
/// it. That is what makes a cancelled placement roll back.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

/// Owner of the per-product stock counters.
#[async_trait]
pub trait InventoryLedger<Tx: Send>: Send + Sync {
    /// Current stock as seen by `tx`.
    async fn stock(&self, tx: &mut Tx, product_id: ProductId) -> Result<StockLevel, StoreError>;

    /// Decrement by the reserved quantity only if enough stock is available,
    /// as one indivisible step inside `tx`. Returns the level after the
    /// decrement.
    ///
    /// Errors: `NotFound` for an unknown product, `InsufficientStock` when the
    /// counter is below the requested quantity (the counter is left as is).
    async fn check_and_reserve(
        &self,
        tx: &mut Tx,
        reservation: &StockReservation,
    ) -> Result<StockLevel, StoreError>;
}

/// Order header + line persistence.
///
/// `insert` and `insert_item` only run inside a placement transaction; the
/// other operations run on their own.
#[async_trait]
pub trait OrderStore<Tx: Send>: Send + Sync {
    /// Persist the header with status `PENDING`; returns it with the assigned id.
    async fn insert(&self, tx: &mut Tx, order: &NewOrder) -> Result<Order, StoreError>;

    async fn insert_item(&self, tx: &mut Tx, item: &OrderItem) -> Result<(), StoreError>;

    async fn get(&self, id: OrderId) -> Result<Order, StoreError>;

    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Items of every order in `order_ids`, in insertion order. One round trip
    /// regardless of how many orders are listed.
    async fn list_items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError>;

    async fn list_product_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Set the status and audit fields; `NotFound` if the order is absent.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_by: UserId,
    ) -> Result<Order, StoreError>;

    /// Remove the header and, by cascade, its items. Returns whether a row was
    /// removed.
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError>;
}

/// The slice of the cart collaborator that placement consumes.
#[async_trait]
pub trait CartStore<Tx: Send>: Send + Sync {
    /// Remove every cart entry of `user_id`; returns how many were removed.
    async fn clear(&self, tx: &mut Tx, user_id: UserId) -> Result<u64, StoreError>;
}
