use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Money, OrderId, ProductId, UserId};
use storefront_orders::{Order, OrderDetails, OrderItem, OrderLine, OrderStatus, PaymentMethod, PlaceOrder};

// -------------------------
// Request DTOs
// -------------------------

/// Money fields are decimals in the major unit (e.g. `40.0`).
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub amount: f64,
    #[serde(default)]
    pub shipping_amount: f64,
    pub shipping_address: String,
    pub payment_method: String,
    pub order_items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
    pub price: f64,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "type")]
    pub status: String,
}

impl PlaceOrderRequest {
    /// Map the wire shape onto the placement command for `user_id`.
    pub fn into_command(self, user_id: UserId) -> Result<PlaceOrder, DomainError> {
        let lines = self
            .order_items
            .into_iter()
            .map(OrderItemRequest::into_line)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PlaceOrder {
            user_id,
            amount: Money::from_decimal(self.amount)?,
            shipping_amount: Money::from_decimal(self.shipping_amount)?,
            shipping_address: self.shipping_address,
            lines,
            payment_method: self.payment_method.parse::<PaymentMethod>()?,
        })
    }
}

impl OrderItemRequest {
    fn into_line(self) -> Result<OrderLine, DomainError> {
        if self.product_id <= 0 {
            return Err(DomainError::validation("product_id must be a positive integer"));
        }
        let product_id = ProductId::new(self.product_id);
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "quantity for product {product_id} must be greater than 0"
                ))
            })?;

        Ok(OrderLine::new(product_id, quantity, Money::from_decimal(self.price)?)
            .with_variant(self.color, self.size))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub amount: f64,
    pub shipping_amount: f64,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_items: Option<Vec<OrderItemResponse>>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: f64,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            amount: order.amount.to_decimal(),
            shipping_amount: order.shipping_amount.to_decimal(),
            shipping_address: order.shipping_address,
            status: order.status,
            updated_by: order.updated_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
            order_items: None,
        }
    }
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let items = details.items.into_iter().map(OrderItemResponse::from).collect();
        Self {
            order_items: Some(items),
            ..OrderResponse::from(details.order)
        }
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price.to_decimal(),
            color: item.color,
            size: item.size,
        }
    }
}

pub fn details_to_response(orders: Vec<OrderDetails>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}
