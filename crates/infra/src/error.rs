use thiserror::Error;

use storefront_core::DomainError;
use storefront_inventory::InsufficientStock;

use crate::store::StoreError;

/// Caller-facing error taxonomy of the order operations.
///
/// One error per failed call. `Validation` and `InvalidStatus` are raised
/// before any storage work starts.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Storage or transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for OrderServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => OrderServiceError::Validation(msg),
            DomainError::InvalidId(msg) => OrderServiceError::Validation(msg),
            DomainError::InvalidStatus(msg) => OrderServiceError::InvalidStatus(msg),
        }
    }
}

impl From<StoreError> for OrderServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => OrderServiceError::NotFound { entity, id },
            StoreError::InsufficientStock(shortfall) => OrderServiceError::InsufficientStock(shortfall),
            other @ (StoreError::Corrupt { .. } | StoreError::Database { .. }) => {
                OrderServiceError::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::ProductId;

    #[test]
    fn shortfall_detail_survives_conversion() {
        let shortfall = InsufficientStock {
            product_id: ProductId::new(3),
            available: 1,
            requested: 2,
        };
        match OrderServiceError::from(StoreError::from(shortfall)) {
            OrderServiceError::InsufficientStock(s) => assert_eq!(s, shortfall),
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn database_failures_become_internal() {
        let err = OrderServiceError::from(StoreError::Database {
            operation: "commit_transaction",
            message: "connection reset".to_string(),
        });
        assert!(matches!(err, OrderServiceError::Internal(msg) if msg.contains("commit_transaction")));
    }

    #[test]
    fn domain_status_errors_keep_their_kind() {
        let err = OrderServiceError::from(DomainError::invalid_status("unknown order status: \"X\""));
        assert!(matches!(err, OrderServiceError::InvalidStatus(_)));
    }
}
