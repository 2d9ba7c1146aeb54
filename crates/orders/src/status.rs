//! Order status workflow.
//!
//! Canonical lifecycle: `PENDING → PROCESSING → SHIPPED → DELIVERED`.
//!
//! Any of the four states is an acceptable target: administrators may move an
//! order backwards or skip a step. Only the target's validity is enforced;
//! `TransitionKind` tells callers whether a change followed the canonical path.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
}

/// How a requested status change relates to the canonical workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// One step forward along the canonical path.
    Advance,
    /// Target equals the current status.
    Unchanged,
    /// Skips a step or moves backwards.
    Override,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    /// Status of every freshly placed order.
    pub const INITIAL: OrderStatus = OrderStatus::Pending;

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    /// Canonical successor, `None` for the terminal state.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    pub fn classify_transition(&self, target: OrderStatus) -> TransitionKind {
        if *self == target {
            TransitionKind::Unchanged
        } else if self.next() == Some(target) {
            TransitionKind::Advance
        } else {
            TransitionKind::Override
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::invalid_status(format!("unknown order status: {s:?}")))
    }
}
