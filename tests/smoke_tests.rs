use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use kitchen_hub::api::AppState;
use kitchen_hub::config::Config;
use kitchen_hub::services::DesiredAdmin;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = kitchen_hub::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    TestApp {
        router: kitchen_hub::api::router(state.clone()),
        state,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn admin_id(&self) -> i32 {
        let desired = DesiredAdmin::from(&self.state.config.admin);
        self.state
            .reconciler
            .reconcile(&desired)
            .await
            .unwrap()
            .user_id()
    }

    async fn customer_id(&self, username: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_i64().unwrap()
    }

    /// Creates a category with two menu items priced 4.99 and 2.50.
    async fn seed_menu(&self) -> (i64, i64) {
        let (_, body) = self
            .send(
                Method::POST,
                "/api/categories",
                Some(json!({ "name": "Lunch" })),
            )
            .await;
        let category_id = body["data"]["id"].as_i64().unwrap();

        let mut ids = Vec::new();
        for (name, price) in [("Chapati Wrap", 4.99), ("Chai", 2.5)] {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/menu",
                    Some(json!({ "name": name, "price": price, "category_id": category_id })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            ids.push(body["data"]["id"].as_i64().unwrap());
        }
        (ids[0], ids[1])
    }
}

#[tokio::test]
async fn test_order_flow() {
    let app = spawn_app().await;
    let customer = app.customer_id("wanjiru").await;
    let (wrap, chai) = app.seed_menu().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(json!({
                "user_id": customer,
                "items": [
                    { "menu_item_id": wrap, "quantity": 3 },
                    { "menu_item_id": chai, "quantity": 2 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["total_amount"], 19.97);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    let order_id = body["data"]["id"].as_i64().unwrap();

    // Later price changes do not touch placed orders
    app.send(
        Method::PUT,
        &format!("/api/menu/{wrap}"),
        Some(json!({ "price": 10.0 })),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_amount"], 19.97);
    assert_eq!(body["data"]["username"], "wanjiru");
    assert_eq!(body["data"]["items"][0]["unit_price"], 4.99);

    let (_, body) = app
        .send(Method::GET, &format!("/api/orders/user/{customer}"), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.send(Method::GET, "/api/orders", None).await;
    assert_eq!(body["data"][0]["username"], "wanjiru");

    // Ordered items are protected from deletion
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/menu/{wrap}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_rejections() {
    let app = spawn_app().await;
    let customer = app.customer_id("otieno").await;
    let (wrap, chai) = app.seed_menu().await;

    app.send(
        Method::PUT,
        &format!("/api/menu/{chai}"),
        Some(json!({ "available": false })),
    )
    .await;

    let cases = [
        (json!({ "user_id": customer, "items": [] }), StatusCode::BAD_REQUEST),
        (
            json!({ "user_id": customer, "items": [{ "menu_item_id": wrap, "quantity": 0 }] }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "user_id": customer, "items": [{ "menu_item_id": chai, "quantity": 1 }] }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "user_id": customer, "items": [{ "menu_item_id": 999, "quantity": 1 }] }),
            StatusCode::NOT_FOUND,
        ),
        (
            json!({ "user_id": 999, "items": [{ "menu_item_id": wrap, "quantity": 1 }] }),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (payload, expected) in cases {
        let (status, body) = app.send(Method::POST, "/api/orders", Some(payload)).await;
        assert_eq!(status, expected, "unexpected response: {body}");
    }

    // A rejected order leaves nothing behind
    let (_, body) = app.send(Method::GET, "/api/orders", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_dashboard_and_gating() {
    let app = spawn_app().await;
    let admin = app.admin_id().await;
    let customer = app.customer_id("kamau").await;
    let (wrap, _) = app.seed_menu().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(json!({ "user_id": customer, "items": [{ "menu_item_id": wrap, "quantity": 2 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/admin/dashboard?user_id={admin}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_users"], 2);
    assert_eq!(body["data"]["total_orders"], 1);
    assert_eq!(body["data"]["total_menu_items"], 2);
    assert_eq!(body["data"]["pending_orders"], 1);
    assert_eq!(body["data"]["total_revenue"], 9.98);

    for uri in [
        format!("/api/admin/dashboard?user_id={customer}"),
        "/api/admin/dashboard".to_string(),
        "/api/admin/users?user_id=999".to_string(),
    ] {
        let (status, body) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["success"], false);
    }

    let (status, body) = app
        .send(Method::GET, &format!("/api/admin/users?user_id={admin}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_order_status_updates_are_admin_only() {
    let app = spawn_app().await;
    let admin = app.admin_id().await;
    let customer = app.customer_id("achieng").await;
    let (wrap, _) = app.seed_menu().await;

    let (_, body) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(json!({ "user_id": customer, "items": [{ "menu_item_id": wrap, "quantity": 1 }] })),
        )
        .await;
    let order_id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{order_id}/status");

    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some(json!({ "user_id": customer, "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some(json!({ "user_id": admin, "status": "shipped" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some(json!({ "user_id": admin, "status": "Preparing" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "preparing");

    // Cancelled orders drop out of revenue
    app.send(
        Method::PATCH,
        &uri,
        Some(json!({ "user_id": admin, "status": "cancelled" })),
    )
    .await;
    let (_, body) = app
        .send(
            Method::GET,
            &format!("/api/admin/dashboard?user_id={admin}"),
            None,
        )
        .await;
    assert_eq!(body["data"]["total_revenue"], 0.0);
    assert_eq!(body["data"]["pending_orders"], 0);

    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/orders/999/status",
            Some(json!({ "user_id": admin, "status": "ready" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_endpoint() {
    let app = spawn_app().await;
    let admin = app.admin_id().await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/admin/reconcile?user_id={admin}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "updated");
    assert_eq!(body["data"]["user_id"], admin);

    // The configured bootstrap password still logs in
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "admin", "password": "admin123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_admin"], true);

    let (status, _) = app
        .send(Method::POST, "/api/admin/reconcile", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
