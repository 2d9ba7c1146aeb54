//! Post-commit payment notification.
//!
//! Placement hands the committed order to a `PaymentNotifier` on a detached
//! task. Notifier failures are logged and never reach the placement caller.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

use storefront_core::{Money, OrderId, UserId};
use storefront_orders::{Order, PaymentMethod};

/// Payload of a payment initiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInitiation {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
}

impl PaymentInitiation {
    pub fn for_order(order: &Order, method: PaymentMethod) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            amount: order.amount,
            method,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no payment subscriber is listening")]
    NoSubscribers,
}

#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    async fn notify(&self, initiation: &PaymentInitiation) -> Result<(), NotifyError>;
}

/// Default notifier: records the initiation in the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPaymentNotifier;

#[async_trait]
impl PaymentNotifier for LogPaymentNotifier {
    async fn notify(&self, initiation: &PaymentInitiation) -> Result<(), NotifyError> {
        info!(
            order_id = %initiation.order_id,
            user_id = %initiation.user_id,
            amount = %initiation.amount,
            method = %initiation.method,
            "payment initiation requested"
        );
        Ok(())
    }
}

/// Publishes initiations on an in-process broadcast channel.
///
/// Lossy: slow subscribers miss messages once the channel buffer wraps, and a
/// send with no subscriber is reported as `NoSubscribers`.
#[derive(Debug, Clone)]
pub struct BroadcastPaymentNotifier {
    sender: broadcast::Sender<PaymentInitiation>,
}

impl BroadcastPaymentNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentInitiation> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl PaymentNotifier for BroadcastPaymentNotifier {
    async fn notify(&self, initiation: &PaymentInitiation) -> Result<(), NotifyError> {
        self.sender
            .send(initiation.clone())
            .map(|_| ())
            .map_err(|_| NotifyError::NoSubscribers)
    }
}
