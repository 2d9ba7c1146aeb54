use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::{OrderId, ProductId, UserId};

use crate::app::dto::{self, OrderItemResponse, OrderResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

/// Order administration routes, mounted under `/orders`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/status", get(list_orders_by_status))
        .route(
            "/:id",
            get(get_order).put(update_order_status).delete(delete_order),
        )
}

fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = storefront_core::DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}

/// User-scoped routes only serve the user named in the path.
fn require_owner(actor: &ActorContext, user_id: UserId) -> Result<(), axum::response::Response> {
    if actor.is(user_id) {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "caller does not match the user in the path",
        ))
    }
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let user_id: UserId = match parse_id(&user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_owner(&actor, user_id) {
        return resp;
    }

    let command = match body.into_command(user_id) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders.place_order(command).await {
        Ok(details) => (StatusCode::CREATED, Json(OrderResponse::from(details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_user_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match parse_id(&user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_owner(&actor, user_id) {
        return resp;
    }

    match services.orders.list_by_user(user_id).await {
        Ok(orders) => Json(dto::details_to_response(orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path((user_id, order_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (user_id, order_id): (UserId, OrderId) = match (parse_id(&user_id), parse_id(&order_id)) {
        (Ok(u), Ok(o)) => (u, o),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    if let Err(resp) = require_owner(&actor, user_id) {
        return resp;
    }

    match services.orders.get_user_order(user_id, order_id).await {
        Ok(details) => Json(OrderResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.orders.list_all().await {
        Ok(orders) => Json(dto::details_to_response(orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders_by_status(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::StatusQuery>,
) -> axum::response::Response {
    match services.orders.list_by_status(&query.status).await {
        Ok(orders) => Json(dto::details_to_response(orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.get_order_details(id).await {
        Ok(details) => Json(OrderResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .orders
        .transition_status(id, &body.status, actor.user_id())
        .await
    {
        Ok(order) => Json(OrderResponse::from(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.delete_order(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_product_items(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match parse_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.list_product_items(product_id).await {
        Ok(items) => Json(
            items
                .into_iter()
                .map(OrderItemResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
