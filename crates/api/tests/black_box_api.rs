use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use sweetshop_api::app::{build_router, AppServices};
use sweetshop_auth::{JwtClaims, Role};
use sweetshop_core::{Money, UserId};
use sweetshop_infra::{InMemoryStore, Storage};
use sweetshop_products::NewProduct;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let dyn_store: Arc<dyn Storage> = store.clone();

        // Same router as prod, but bound to an ephemeral port.
        let app = build_router(JWT_SECRET, AppServices::new(dyn_store));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    async fn seed(&self, name: &str, price: u64, stock: i64) -> String {
        let product = NewProduct {
            name: name.to_string(),
            price: Money::from_minor(price),
            category: "Candy".to_string(),
            stock,
            image_url: None,
        }
        .into_product()
        .unwrap();
        self.store.insert_product(&product).await.unwrap();
        product.id().to_string()
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

fn mint_jwt(user_id: UserId, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        role,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn stock_of(client: &reqwest::Client, srv: &TestServer, product_id: &str) -> i64 {
    let res = client
        .get(srv.url(&format!("/sweets/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/cart", "/orders", "/admin/orders"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let res = client
        .get(srv.url("/cart"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        role: Role::Admin,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reflects_token_identity() {
    let srv = TestServer::spawn().await;
    let user = UserId::new();
    let token = mint_jwt(user, Role::User);

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user.to_string());
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
async fn catalog_is_public() {
    let srv = TestServer::spawn().await;
    let id = srv.seed("Gummy Bears", 250, 12).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/sweets")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"].as_str().unwrap(), id);
    assert_eq!(list[0]["price"], 250);

    let res = client
        .get(srv.url(&format!("/sweets/{}", sweetshop_core::ProductId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/sweets/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn cart_lifecycle_reserves_and_returns_stock() {
    let srv = TestServer::spawn().await;
    let product_id = srv.seed("Toffee", 10, 5).await;
    let token = mint_jwt(UserId::new(), Role::User);
    let client = reqwest::Client::new();

    // Reading never creates a cart.
    let res = client.get(srv.url("/cart")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["cart_id"].is_null());
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 0);

    // Add 3
    let res = client
        .post(srv.url("/cart/add"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let line: Value = res.json().await.unwrap();
    assert_eq!(line["quantity"], 3);
    assert_eq!(line["price"], 30);
    let line_id = line["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&client, &srv, &product_id).await, 2);

    // Add 3 more exceeds stock: nothing changes.
    let res = client
        .post(srv.url("/cart/add"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "out_of_stock");
    assert_eq!(stock_of(&client, &srv, &product_id).await, 2);

    // Update to 5
    let res = client
        .put(srv.url("/cart/update"))
        .bearer_auth(&token)
        .json(&json!({ "cart_item_id": line_id, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let line: Value = res.json().await.unwrap();
    assert_eq!(line["quantity"], 5);
    assert_eq!(line["price"], 50);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 0);

    // Update below 1 is rejected.
    let res = client
        .put(srv.url("/cart/update"))
        .bearer_auth(&token)
        .json(&json!({ "cart_item_id": line_id, "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_quantity");

    // Update to 1
    let res = client
        .put(srv.url("/cart/update"))
        .bearer_auth(&token)
        .json(&json!({ "cart_item_id": line_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 4);

    let res = client.get(srv.url("/cart")).bearer_auth(&token).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], 10);

    // Remove
    let res = client
        .delete(srv.url(&format!("/cart/remove/{line_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["returned_stock"], 1);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 5);

    let res = client
        .delete(srv.url(&format!("/cart/remove/{line_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_users_cart_line_is_forbidden() {
    let srv = TestServer::spawn().await;
    let product_id = srv.seed("Fudge", 400, 10).await;
    let owner = mint_jwt(UserId::new(), Role::User);
    let intruder = mint_jwt(UserId::new(), Role::User);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/add"))
        .bearer_auth(&owner)
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    let line: Value = res.json().await.unwrap();
    let line_id = line["id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.url("/cart/update"))
        .bearer_auth(&intruder)
        .json(&json!({ "cart_item_id": line_id, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/cart/remove/{line_id}")))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(stock_of(&client, &srv, &product_id).await, 8);
}

#[tokio::test]
async fn place_order_creates_pending_order_and_lists_it() {
    let srv = TestServer::spawn().await;
    let product_id = srv.seed("Nougat", 300, 5).await;
    let token = mint_jwt(UserId::new(), Role::User);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/order"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 5);

    let res = client
        .post(srv.url("/order"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["total"], 600);
    assert_eq!(order["items"][0]["product_name"], "Nougat");
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 3);

    let res = client.get(srv.url("/orders")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let orders: Value = res.json().await.unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);

    let other = mint_jwt(UserId::new(), Role::User);
    let res = client.get(srv.url("/orders")).bearer_auth(&other).send().await.unwrap();
    let orders: Value = res.json().await.unwrap();
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let srv = TestServer::spawn().await;
    let product_id = srv.seed("Marzipan", 500, 1).await;
    let user = mint_jwt(UserId::new(), Role::User);
    let admin = mint_jwt(UserId::new(), Role::Admin);
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/admin/orders"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url(&format!("/admin/inventory/{product_id}/restock")))
        .bearer_auth(&user)
        .json(&json!({ "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&client, &srv, &product_id).await, 1);

    let res = client
        .post(srv.url(&format!("/admin/inventory/{product_id}/restock")))
        .bearer_auth(&admin)
        .json(&json!({ "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let product: Value = res.json().await.unwrap();
    assert_eq!(product["stock"], 11);

    let res = client
        .post(srv.url("/order"))
        .bearer_auth(&user)
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(srv.url("/admin/orders"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let orders: Value = res.json().await.unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["items"][0]["product_name"], "Marzipan");
}

#[tokio::test]
async fn malformed_bodies_get_json_error_objects() {
    let srv = TestServer::spawn().await;
    let product_id = srv.seed("Bonbons", 120, 4).await;
    let token = mint_jwt(UserId::new(), Role::User);
    let admin = mint_jwt(UserId::new(), Role::Admin);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/add"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": "3" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
    assert!(body["message"].as_str().unwrap().contains("quantity"));

    let res = client
        .put(srv.url("/cart/update"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let res = client
        .post(srv.url("/order"))
        .bearer_auth(&token)
        .body(r#"{"product_id":"x","quantity":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let res = client
        .post(srv.url(&format!("/admin/inventory/{product_id}/restock")))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    assert_eq!(stock_of(&client, &srv, &product_id).await, 4);
}
