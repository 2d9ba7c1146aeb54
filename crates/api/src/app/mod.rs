//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection and order service construction
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router over already-wired services.
pub fn build_app(services: AppServices) -> Router {
    // Order routes: require a caller identity.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::actor_middleware)));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
