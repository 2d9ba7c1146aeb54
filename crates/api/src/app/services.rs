//! Infrastructure wiring: picks the storage backend and builds the order
//! service the handlers share.

use std::sync::Arc;

use storefront_infra::store::{InMemoryDatabase, PgDatabase, StoreError};
use storefront_infra::{
    Backend, InMemoryOrderService, LogPaymentNotifier, OrderOperations, PaymentNotifier,
    PostgresOrderService, Settings,
};

#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<dyn OrderOperations>,
}

impl AppServices {
    pub fn new(orders: Arc<dyn OrderOperations>) -> Self {
        Self { orders }
    }

    /// In-memory wiring (dev/test) over an existing database handle, so
    /// callers can seed products and carts.
    pub fn in_memory(db: &InMemoryDatabase, notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self::new(Arc::new(InMemoryOrderService::in_memory(db, notifier)))
    }
}

pub async fn build_services(settings: &Settings) -> Result<AppServices, StoreError> {
    let notifier: Arc<dyn PaymentNotifier> = Arc::new(LogPaymentNotifier);

    match &settings.backend {
        Backend::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory(&InMemoryDatabase::new(), notifier))
        }
        Backend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections, "using postgres stores");
            let db = PgDatabase::connect(database_url, *max_connections).await?;
            db.migrate().await?;
            Ok(AppServices::new(Arc::new(PostgresOrderService::postgres(&db, notifier))))
        }
    }
}
