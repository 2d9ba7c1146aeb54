use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, ProductId};

/// Rejected reservation: the product does not hold enough stock.
///
/// Carries both sides of the comparison so callers can render an actionable
/// message without another lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("not enough stock for product {product_id}. Available: {available}, Requested: {requested}")]
pub struct InsufficientStock {
    pub product_id: ProductId,
    pub available: u32,
    pub requested: u32,
}

/// Request to take `quantity` units of a product out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReservation {
    product_id: ProductId,
    quantity: u32,
}

impl StockReservation {
    pub fn new(product_id: ProductId, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than 0"));
        }
        Ok(Self {
            product_id,
            quantity,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Current authoritative stock counter for one product.
///
/// The counter is unsigned: a level can never be negative, and `reserve` is
/// the only way to lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub available: u32,
}

impl StockLevel {
    pub fn new(product_id: ProductId, available: u32) -> Self {
        Self {
            product_id,
            available,
        }
    }

    /// Check-and-decrement as one step: returns the level after the
    /// reservation, or the shortfall. The receiver is never modified.
    pub fn reserve(&self, reservation: &StockReservation) -> Result<StockLevel, InsufficientStock> {
        debug_assert_eq!(reservation.product_id, self.product_id);

        match self.available.checked_sub(reservation.quantity) {
            Some(remaining) => Ok(StockLevel::new(self.product_id, remaining)),
            None => Err(InsufficientStock {
                product_id: self.product_id,
                available: self.available,
                requested: reservation.quantity,
            }),
        }
    }
}
