//! Order placement coordinator.
//!
//! Turns a validated `PlaceOrder` request into a committed order as one unit
//! of work:
//!
//! ```text
//! PlaceOrder
//!   ↓
//! 1. Validate (no transaction is opened for a malformed request)
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. Insert order header (status PENDING, id assigned)
//!   ↓
//! 4. Per line, in submitted order: reserve stock, insert item
//!   ↓
//! 5. Clear the user's cart
//!   ↓
//! 6. Commit
//!   ↓
//! 7. Hand the order to the payment notifier (detached)
//! ```
//!
//! Any failure in steps 3-6 rolls the whole transaction back. The first line
//! that cannot be reserved is the one reported. If the caller's future is
//! dropped mid-placement the transaction handle is dropped with it, which
//! discards the pending work on both backends.

use std::sync::Arc;

use tracing::{Instrument, Span, info, info_span, instrument, warn};
use uuid::Uuid;

use storefront_inventory::StockReservation;
use storefront_orders::{OrderDetails, OrderLine, PaymentMethod, PlaceOrder};

use crate::error::OrderServiceError;
use crate::notify::{PaymentInitiation, PaymentNotifier};
use crate::store::{CartStore, InventoryLedger, OrderStore, StoreError, UnitOfWork};

/// Coordinates the ledger, the order store and the cart inside one
/// transaction opened through `U`.
pub struct PlacementCoordinator<U, L, O, C> {
    uow: U,
    ledger: L,
    orders: O,
    carts: C,
    notifier: Arc<dyn PaymentNotifier>,
}

impl<U, L, O, C> PlacementCoordinator<U, L, O, C> {
    pub fn new(uow: U, ledger: L, orders: O, carts: C, notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self {
            uow,
            ledger,
            orders,
            carts,
            notifier,
        }
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }
}

impl<U, L, O, C> PlacementCoordinator<U, L, O, C>
where
    U: UnitOfWork,
    L: InventoryLedger<U::Tx>,
    O: OrderStore<U::Tx>,
    C: CartStore<U::Tx>,
{
    /// Place an order. On success the returned details hold the committed
    /// header (status PENDING) and one item per submitted line.
    #[instrument(
        skip(self, request),
        fields(
            placement_id = %Uuid::now_v7(),
            user_id = %request.user_id,
            line_count = request.lines.len(),
            amount = %request.amount,
            lines_total = tracing::field::Empty,
            order_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn place(&self, request: &PlaceOrder) -> Result<OrderDetails, OrderServiceError> {
        request.validate()?;
        if let Some(total) = request.lines_total() {
            Span::current().record("lines_total", tracing::field::display(total));
        }
        let reservations = request
            .lines
            .iter()
            .map(OrderLine::reservation)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.uow.begin().await?;

        let details = match self.apply(&mut tx, request, &reservations).await {
            Ok(details) => details,
            Err(err) => {
                if let Err(rollback_err) = self.uow.rollback(tx).await {
                    // The dropped transaction is discarded anyway; keep the original error.
                    warn!(error = %rollback_err, "rollback after failed placement did not complete");
                }
                return Err(err.into());
            }
        };

        self.uow.commit(tx).await?;

        info!(
            order_id = %details.order.id,
            item_count = details.items.len(),
            "order placed"
        );
        self.dispatch_payment(&details, request.payment_method);
        Ok(details)
    }

    async fn apply(
        &self,
        tx: &mut U::Tx,
        request: &PlaceOrder,
        reservations: &[StockReservation],
    ) -> Result<OrderDetails, StoreError> {
        let order = self.orders.insert(tx, &request.header()).await?;
        Span::current().record("order_id", order.id.get());

        let mut items = Vec::with_capacity(request.lines.len());
        for (line, reservation) in request.lines.iter().zip(reservations) {
            self.ledger.check_and_reserve(tx, reservation).await?;

            let item = line.bind(order.id);
            self.orders.insert_item(tx, &item).await?;
            items.push(item);
        }

        self.carts.clear(tx, request.user_id).await?;

        Ok(OrderDetails { order, items })
    }

    fn dispatch_payment(&self, details: &OrderDetails, method: PaymentMethod) {
        let notifier = Arc::clone(&self.notifier);
        let initiation = PaymentInitiation::for_order(&details.order, method);
        let span = info_span!("payment_notification", order_id = %initiation.order_id, %method);

        tokio::spawn(
            async move {
                if let Err(err) = notifier.notify(&initiation).await {
                    warn!(error = %err, "payment notification failed");
                }
            }
            .instrument(span),
        );
    }
}
