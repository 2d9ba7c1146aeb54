use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use storefront_core::UserId;

use crate::context::ActorContext;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the caller from `x-user-id`; requests without a valid id are
/// rejected with 401 before reaching a handler.
pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = extract_user_id(req.headers())?;
    req.extensions_mut().insert(ActorContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<UserId, StatusCode> {
    let header = headers
        .get(USER_ID_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    header.parse::<UserId>().map_err(|_| StatusCode::UNAUTHORIZED)
}
