//! Caller-facing order operations.
//!
//! `OrderService` composes the placement coordinator with the read and
//! status-transition paths of the order store. `OrderOperations` is the
//! object-safe view of it that the HTTP layer holds, so the backend can be
//! chosen at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use storefront_core::{OrderId, ProductId, UserId};
use storefront_orders::{Order, OrderDetails, OrderItem, OrderStatus, PlaceOrder};

use crate::error::OrderServiceError;
use crate::notify::PaymentNotifier;
use crate::placement::PlacementCoordinator;
use crate::store::{
    CartStore, InMemoryDatabase, InventoryLedger, MemoryCartStore, MemoryInventoryLedger,
    MemoryOrderStore, MemoryUnitOfWork, OrderStore, PgCartStore, PgDatabase, PgInventoryLedger,
    PgOrderStore, PgUnitOfWork, UnitOfWork,
};

#[async_trait]
pub trait OrderOperations: Send + Sync {
    async fn place_order(&self, request: PlaceOrder) -> Result<OrderDetails, OrderServiceError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, OrderServiceError>;

    async fn get_order_details(&self, id: OrderId) -> Result<OrderDetails, OrderServiceError>;

    /// Like `get_order_details`, but an order owned by someone else is
    /// reported as not found.
    async fn get_user_order(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<OrderDetails, OrderServiceError>;

    /// Listings return each order together with its items.
    async fn list_all(&self) -> Result<Vec<OrderDetails>, OrderServiceError>;

    /// `status` is matched case-insensitively against the four lifecycle states.
    async fn list_by_status(&self, status: &str) -> Result<Vec<OrderDetails>, OrderServiceError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>, OrderServiceError>;

    async fn list_product_items(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<OrderItem>, OrderServiceError>;

    /// Move an order to `status` on behalf of `actor`. An unknown status is
    /// rejected before the order is read, so the stored status never changes
    /// on failure.
    async fn transition_status(
        &self,
        id: OrderId,
        status: &str,
        actor: UserId,
    ) -> Result<Order, OrderServiceError>;

    /// Hard delete of the order and its items. Stock is not restored.
    /// Deleting an absent order succeeds.
    async fn delete_order(&self, id: OrderId) -> Result<(), OrderServiceError>;
}

pub struct OrderService<U, L, O, C> {
    placement: PlacementCoordinator<U, L, O, C>,
}

pub type InMemoryOrderService =
    OrderService<MemoryUnitOfWork, MemoryInventoryLedger, MemoryOrderStore, MemoryCartStore>;

pub type PostgresOrderService = OrderService<PgUnitOfWork, PgInventoryLedger, PgOrderStore, PgCartStore>;

impl<U, L, O, C> OrderService<U, L, O, C> {
    pub fn new(placement: PlacementCoordinator<U, L, O, C>) -> Self {
        Self { placement }
    }

    fn store(&self) -> &O {
        self.placement.orders()
    }
}

impl<U, L, O, C> OrderService<U, L, O, C>
where
    U: UnitOfWork,
    O: OrderStore<U::Tx>,
{
    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>, OrderServiceError> {
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: BTreeMap<OrderId, Vec<OrderItem>> = BTreeMap::new();
        for item in self.store().list_items_for(&ids).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderDetails { order, items }
            })
            .collect())
    }
}

impl InMemoryOrderService {
    pub fn in_memory(db: &InMemoryDatabase, notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self::new(PlacementCoordinator::new(
            db.unit_of_work(),
            db.ledger(),
            db.orders(),
            db.carts(),
            notifier,
        ))
    }
}

impl PostgresOrderService {
    pub fn postgres(db: &PgDatabase, notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self::new(PlacementCoordinator::new(
            db.unit_of_work(),
            db.ledger(),
            db.orders(),
            db.carts(),
            notifier,
        ))
    }
}

#[async_trait]
impl<U, L, O, C> OrderOperations for OrderService<U, L, O, C>
where
    U: UnitOfWork + 'static,
    L: InventoryLedger<U::Tx> + 'static,
    O: OrderStore<U::Tx> + 'static,
    C: CartStore<U::Tx> + 'static,
{
    async fn place_order(&self, request: PlaceOrder) -> Result<OrderDetails, OrderServiceError> {
        self.placement.place(&request).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, OrderServiceError> {
        Ok(self.store().get(id).await?)
    }

    async fn get_order_details(&self, id: OrderId) -> Result<OrderDetails, OrderServiceError> {
        let order = self.store().get(id).await?;
        let items = self.store().list_items(id).await?;
        Ok(OrderDetails { order, items })
    }

    #[instrument(skip(self), fields(%user_id, order_id = %id), err)]
    async fn get_user_order(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<OrderDetails, OrderServiceError> {
        let details = self.get_order_details(id).await?;
        if details.order.user_id != user_id {
            return Err(OrderServiceError::NotFound {
                entity: "order",
                id: id.get(),
            });
        }
        Ok(details)
    }

    async fn list_all(&self) -> Result<Vec<OrderDetails>, OrderServiceError> {
        let orders = self.store().list_all().await?;
        self.with_items(orders).await
    }

    async fn list_by_status(&self, status: &str) -> Result<Vec<OrderDetails>, OrderServiceError> {
        let status = status.parse::<OrderStatus>()?;
        let orders = self.store().list_by_status(status).await?;
        self.with_items(orders).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>, OrderServiceError> {
        let orders = self.store().list_by_user(user_id).await?;
        self.with_items(orders).await
    }

    async fn list_product_items(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<OrderItem>, OrderServiceError> {
        Ok(self.store().list_product_items(product_id).await?)
    }

    #[instrument(skip(self), fields(order_id = %id, %actor), err)]
    async fn transition_status(
        &self,
        id: OrderId,
        status: &str,
        actor: UserId,
    ) -> Result<Order, OrderServiceError> {
        let target = status.parse::<OrderStatus>()?;

        let current = self.store().get(id).await?;
        let kind = current.status.classify_transition(target);

        let updated = self.store().update_status(id, target, actor).await?;
        info!(from = %current.status, to = %target, ?kind, "order status changed");
        Ok(updated)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> Result<(), OrderServiceError> {
        let removed = self.store().delete(id).await?;
        info!(removed, "order deleted");
        Ok(())
    }
}
