use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use storefront_api::app::{AppServices, build_app};
use storefront_core::{ProductId, UserId};
use storefront_infra::LogPaymentNotifier;
use storefront_infra::store::InMemoryDatabase;

struct TestServer {
    base_url: String,
    db: InMemoryDatabase,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        storefront_observability::tracing::init_for_tests();

        // Same router as prod, in-memory backend, ephemeral port.
        let db = InMemoryDatabase::new();
        let app = build_app(AppServices::in_memory(&db, Arc::new(LogPaymentNotifier)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, db, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn order_body(quantity: i64) -> serde_json::Value {
    json!({
        "amount": 40.0,
        "shipping_amount": 5.0,
        "shipping_address": "Nairobi",
        "payment_method": "MPESA",
        "order_items": [
            { "product_id": 1, "quantity": quantity, "price": 20.0, "color": "blue" }
        ]
    })
}

async fn place(
    client: &reqwest::Client,
    srv: &TestServer,
    user: i64,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(srv.url(&format!("/users/{user}/orders")))
        .header("x-user-id", user.to_string())
        .json(&order_body(quantity))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_needs_no_identity() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_required_for_order_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Placing an order for somebody else.
    let res = client
        .post(srv.url("/users/2/orders"))
        .header("x-user-id", "1")
        .json(&order_body(1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn place_order_happy_path() {
    let srv = TestServer::spawn().await;
    srv.db.put_product(ProductId::new(1), 5).await;
    srv.db.add_to_cart(UserId::new(7), ProductId::new(1), 2).await;
    let client = reqwest::Client::new();

    let res = place(&client, &srv, 7, 2).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["amount"], 40.0);
    assert_eq!(body["shipping_amount"], 5.0);
    assert_eq!(body["order_items"].as_array().unwrap().len(), 1);
    assert_eq!(body["order_items"][0]["color"], "blue");

    assert_eq!(srv.db.stock_of(ProductId::new(1)).await, Some(3));
    assert!(srv.db.cart_of(UserId::new(7)).await.is_empty());

    let id = body["id"].as_i64().unwrap();
    let res = client
        .get(srv.url(&format!("/users/7/orders/{id}")))
        .header("x-user-id", "7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/users/7/orders"))
        .header("x-user-id", "7")
        .send()
        .await
        .unwrap();
    let mine: serde_json::Value = res.json().await.unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], id);
    assert_eq!(mine[0]["order_items"][0]["color"], "blue");
    assert_eq!(mine[0]["order_items"][0]["quantity"], 2);

    // Another user cannot see it.
    let res = client
        .get(srv.url(&format!("/users/8/orders/{id}")))
        .header("x-user-id", "8")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict_with_detail() {
    let srv = TestServer::spawn().await;
    srv.db.put_product(ProductId::new(1), 1).await;
    let client = reqwest::Client::new();

    let res = place(&client, &srv, 7, 2).await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["product_id"], 1);
    assert_eq!(body["available"], 1);
    assert_eq!(body["requested"], 2);
    assert_eq!(srv.db.stock_of(ProductId::new(1)).await, Some(1));

    let res = client
        .get(srv.url("/users/7/orders"))
        .header("x-user-id", "7")
        .send()
        .await
        .unwrap();
    let orders: serde_json::Value = res.json().await.unwrap();
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let srv = TestServer::spawn().await;
    srv.db.put_product(ProductId::new(1), 5).await;
    let client = reqwest::Client::new();

    let mut body = order_body(1);
    body["shipping_address"] = json!("");
    let res = client
        .post(srv.url("/users/7/orders"))
        .header("x-user-id", "7")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");

    let res = place(&client, &srv, 7, 3_000_000_000).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.db.stock_of(ProductId::new(1)).await, Some(5));

    let res = client
        .get(srv.url("/orders/abc"))
        .header("x-user-id", "7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_workflow_over_http() {
    let srv = TestServer::spawn().await;
    srv.db.put_product(ProductId::new(1), 5).await;
    let client = reqwest::Client::new();

    let placed: serde_json::Value = place(&client, &srv, 7, 1).await.json().await.unwrap();
    let id = placed["id"].as_i64().unwrap();

    let res = client
        .put(srv.url(&format!("/orders/{id}")))
        .header("x-user-id", "99")
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url(&format!("/orders/{id}")))
        .header("x-user-id", "99")
        .json(&json!({ "status": "processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["status"], "PROCESSING");
    assert_eq!(updated["updated_by"], 99);

    let res = client
        .get(srv.url("/orders/status?type=processing"))
        .header("x-user-id", "99")
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["order_items"].as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["order_items"][0]["product_id"], 1);

    let res = client
        .get(srv.url("/orders"))
        .header("x-user-id", "99")
        .send()
        .await
        .unwrap();
    let all: serde_json::Value = res.json().await.unwrap();
    assert_eq!(all[0]["order_items"][0]["quantity"], 1);

    let res = client
        .put(srv.url("/orders/999"))
        .header("x-user-id", "99")
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/orders/{id}")))
        .header("x-user-id", "99")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .header("x-user-id", "99")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(srv.db.stock_of(ProductId::new(1)).await, Some(4));
}
