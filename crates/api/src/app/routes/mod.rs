use axum::{
    Router,
    routing::{get, post},
};

pub mod orders;
pub mod system;

/// Router for all endpoints that need a caller identity.
pub fn router() -> Router {
    Router::new()
        .route(
            "/users/:user_id/orders",
            post(orders::place_order).get(orders::list_user_orders),
        )
        .route("/users/:user_id/orders/:order_id", get(orders::get_user_order))
        .nest("/orders", orders::router())
        .route("/products/:product_id/order-items", get(orders::list_product_items))
}
