use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Money, OrderId, ProductId, UserId};
use storefront_inventory::StockReservation;

use crate::status::{OrderStatus, TransitionKind};

/// Persisted order header.
///
/// Created only by a successful placement; afterwards only `status`,
/// `updated_by` and `updated_at` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub amount: Money,
    pub shipping_amount: Money,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Apply a status change on behalf of `actor`, refreshing the audit fields.
    pub fn apply_status(
        &mut self,
        target: OrderStatus,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> TransitionKind {
        let kind = self.status.classify_transition(target);
        self.status = target;
        self.updated_by = actor;
        self.updated_at = at;
        kind
    }
}

/// Header of an order that has not been inserted yet (no id, no timestamps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub amount: Money,
    pub shipping_amount: Money,
    pub shipping_address: String,
}

impl NewOrder {
    /// Build the persisted header once the store has assigned an id.
    pub fn into_order(self, id: OrderId, at: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id: self.user_id,
            amount: self.amount,
            shipping_amount: self.shipping_amount,
            shipping_address: self.shipping_address,
            status: OrderStatus::INITIAL,
            updated_by: self.user_id,
            created_at: at,
            updated_at: at,
        }
    }
}

/// One requested line of a placement, before it is bound to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured at order time.
    pub price: Money,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Largest quantity a single line may request; stock counters are stored as
/// 32-bit signed integers.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32, price: Money) -> Self {
        Self {
            product_id,
            quantity,
            price,
            color: None,
            size: None,
        }
    }

    /// Attach the optional variant attributes; blank values count as absent.
    pub fn with_variant(mut self, color: Option<String>, size: Option<String>) -> Self {
        self.color = non_blank(color);
        self.size = non_blank(size);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {} must be greater than 0",
                self.product_id
            )));
        }
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity for product {} must not exceed {MAX_LINE_QUANTITY}",
                self.product_id
            )));
        }
        if !self.price.is_positive() {
            return Err(DomainError::validation(format!(
                "price for product {} must be greater than 0",
                self.product_id
            )));
        }
        Ok(())
    }

    pub fn reservation(&self) -> Result<StockReservation, DomainError> {
        StockReservation::new(self.product_id, self.quantity)
    }

    pub fn bind(&self, order_id: OrderId) -> OrderItem {
        OrderItem {
            order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            price: self.price,
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Persisted order line; immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Header plus its lines, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order() -> NewOrder {
        NewOrder {
            user_id: UserId::new(3),
            amount: Money::from_minor(4000),
            shipping_amount: Money::from_minor(500),
            shipping_address: "Nairobi".to_string(),
        }
    }

    #[test]
    fn inserted_order_starts_pending_and_owned_by_its_user() {
        let at = Utc::now();
        let order = new_order().into_order(OrderId::new(9), at);

        assert_eq!(order.id, OrderId::new(9));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.updated_by, UserId::new(3));
        assert_eq!(order.created_at, at);
        assert_eq!(order.updated_at, at);
    }

    #[test]
    fn applying_status_records_actor_and_time() {
        let created = Utc::now();
        let mut order = new_order().into_order(OrderId::new(1), created);
        let later = created + chrono::Duration::seconds(30);

        let kind = order.apply_status(OrderStatus::Processing, UserId::new(99), later);

        assert_eq!(kind, TransitionKind::Advance);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.updated_by, UserId::new(99));
        assert_eq!(order.updated_at, later);
        assert_eq!(order.created_at, created);
    }

    #[test]
    fn blank_variants_are_dropped() {
        let line = OrderLine::new(ProductId::new(1), 1, Money::from_minor(100))
            .with_variant(Some("  ".to_string()), Some("M".to_string()));
        assert_eq!(line.color, None);
        assert_eq!(line.size.as_deref(), Some("M"));
    }

    #[test]
    fn binding_copies_line_onto_order() {
        let line = OrderLine::new(ProductId::new(4), 2, Money::from_minor(1500))
            .with_variant(Some("red".to_string()), None);
        let item = line.bind(OrderId::new(12));

        assert_eq!(item.order_id, OrderId::new(12));
        assert_eq!(item.product_id, ProductId::new(4));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, Money::from_minor(1500));
        assert_eq!(item.color.as_deref(), Some("red"));
    }

    #[test]
    fn line_validation_rejects_zero_quantity_and_non_positive_price() {
        let zero_qty = OrderLine::new(ProductId::new(1), 0, Money::from_minor(100));
        assert!(matches!(zero_qty.validate(), Err(DomainError::Validation(_))));

        let free = OrderLine::new(ProductId::new(1), 1, Money::ZERO);
        assert!(matches!(free.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn line_validation_caps_quantity_at_storable_range() {
        let largest = OrderLine::new(ProductId::new(1), MAX_LINE_QUANTITY, Money::from_minor(1));
        assert!(largest.validate().is_ok());

        let oversized = OrderLine::new(ProductId::new(1), 3_000_000_000, Money::from_minor(1));
        assert!(matches!(oversized.validate(), Err(DomainError::Validation(_))));
    }
}
