//! In-memory storage backend.
//!
//! Intended for tests/dev. A transaction holds the table lock for its whole
//! lifetime and works on a staged copy of the tables: commit publishes the
//! copy, anything else (explicit rollback, error, drop on cancellation)
//! discards it. Holding the lock serializes placements, which is the
//! strongest form of the row-level serialization Postgres gives us.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use storefront_core::{OrderId, ProductId, UserId};
use storefront_inventory::{StockLevel, StockReservation};
use storefront_orders::{NewOrder, Order, OrderItem, OrderStatus};

use super::r#trait::{CartStore, InventoryLedger, OrderStore, StoreError, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, u32>,
    carts: BTreeMap<UserId, BTreeMap<ProductId, u32>>,
    orders: BTreeMap<OrderId, Order>,
    items: Vec<OrderItem>,
}

/// Shared handle to the in-memory tables.
///
/// Cloning is cheap; every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    // Outside the tables so ids consumed by rolled-back placements are not reused.
    order_sequence: Arc<AtomicI64>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit_of_work(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork { db: self.clone() }
    }

    pub fn ledger(&self) -> MemoryInventoryLedger {
        MemoryInventoryLedger
    }

    pub fn orders(&self) -> MemoryOrderStore {
        MemoryOrderStore { db: self.clone() }
    }

    pub fn carts(&self) -> MemoryCartStore {
        MemoryCartStore
    }

    /// Create or overwrite a product's stock counter.
    pub async fn put_product(&self, product_id: ProductId, quantity: u32) {
        self.tables.lock().await.products.insert(product_id, quantity);
    }

    pub async fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.tables.lock().await.products.get(&product_id).copied()
    }

    /// Add `quantity` of a product to a user's cart (accumulates).
    pub async fn add_to_cart(&self, user_id: UserId, product_id: ProductId, quantity: u32) {
        let mut tables = self.tables.lock().await;
        *tables
            .carts
            .entry(user_id)
            .or_default()
            .entry(product_id)
            .or_default() += quantity;
    }

    pub async fn cart_of(&self, user_id: UserId) -> Vec<(ProductId, u32)> {
        self.tables
            .lock()
            .await
            .carts
            .get(&user_id)
            .map(|entries| entries.iter().map(|(p, q)| (*p, *q)).collect())
            .unwrap_or_default()
    }

    fn next_order_id(&self) -> OrderId {
        OrderId::new(self.order_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Open in-memory transaction: exclusive access plus a staged copy.
#[derive(Debug)]
pub struct MemoryTx {
    _lock: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[derive(Debug, Clone)]
pub struct MemoryUnitOfWork {
    db: InMemoryDatabase,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let lock = self.db.tables.clone().lock_owned().await;
        let staged = lock.clone();
        Ok(MemoryTx {
            _lock: lock,
            staged,
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        let MemoryTx { _lock: mut lock, staged } = tx;
        *lock = staged;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        drop(tx);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryInventoryLedger;

#[async_trait]
impl InventoryLedger<MemoryTx> for MemoryInventoryLedger {
    async fn stock(&self, tx: &mut MemoryTx, product_id: ProductId) -> Result<StockLevel, StoreError> {
        tx.staged
            .products
            .get(&product_id)
            .map(|available| StockLevel::new(product_id, *available))
            .ok_or_else(|| StoreError::product_not_found(product_id))
    }

    #[instrument(skip(self, tx), fields(product_id = %reservation.product_id(), quantity = reservation.quantity()), err)]
    async fn check_and_reserve(
        &self,
        tx: &mut MemoryTx,
        reservation: &StockReservation,
    ) -> Result<StockLevel, StoreError> {
        let product_id = reservation.product_id();
        let counter = tx
            .staged
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::product_not_found(product_id))?;

        let after = StockLevel::new(product_id, *counter).reserve(reservation)?;
        *counter = after.available;
        Ok(after)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryOrderStore {
    db: InMemoryDatabase,
}

impl MemoryOrderStore {
    fn collect_orders(tables: &Tables, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        tables.orders.values().filter(|o| keep(o)).cloned().collect()
    }
}

#[async_trait]
impl OrderStore<MemoryTx> for MemoryOrderStore {
    async fn insert(&self, tx: &mut MemoryTx, order: &NewOrder) -> Result<Order, StoreError> {
        let id = self.db.next_order_id();
        let persisted = order.clone().into_order(id, Utc::now());
        tx.staged.orders.insert(id, persisted.clone());
        Ok(persisted)
    }

    async fn insert_item(&self, tx: &mut MemoryTx, item: &OrderItem) -> Result<(), StoreError> {
        if !tx.staged.orders.contains_key(&item.order_id) {
            return Err(StoreError::order_not_found(item.order_id));
        }
        if !tx.staged.products.contains_key(&item.product_id) {
            return Err(StoreError::product_not_found(item.product_id));
        }
        tx.staged.items.push(item.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let tables = self.db.tables.lock().await;
        tables
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::order_not_found(id))
    }

    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .items
            .iter()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect())
    }

    async fn list_product_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .items
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(Self::collect_orders(&tables, |_| true))
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(Self::collect_orders(&tables, |o| o.status == status))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let tables = self.db.tables.lock().await;
        Ok(Self::collect_orders(&tables, |o| o.user_id == user_id))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_by: UserId,
    ) -> Result<Order, StoreError> {
        let mut tables = self.db.tables.lock().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::order_not_found(id))?;
        order.apply_status(status, updated_by, Utc::now());
        Ok(order.clone())
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut tables = self.db.tables.lock().await;
        let removed = tables.orders.remove(&id).is_some();
        tables.items.retain(|i| i.order_id != id);
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCartStore;

#[async_trait]
impl CartStore<MemoryTx> for MemoryCartStore {
    async fn clear(&self, tx: &mut MemoryTx, user_id: UserId) -> Result<u64, StoreError> {
        Ok(tx
            .staged
            .carts
            .remove(&user_id)
            .map(|entries| entries.len() as u64)
            .unwrap_or(0))
    }
}
