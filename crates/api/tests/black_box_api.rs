use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use kopontren_auth::{Hs256Jwt, JwtClaims, Role};
use kopontren_core::UserId;
use kopontren_infra::notify::StoreNotifier;
use kopontren_infra::services::{ServiceSettings, Services};
use kopontren_infra::store::{MemoryJournal, Store};
use kopontren_infra::uploads::ImageStore;

const JWT_SECRET: &str = "test-secret";
const ADMIN_PASSWORD: &str = "rahasia123";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Store::open(Arc::new(MemoryJournal::default())).await.unwrap();
        let (realtime_tx, _) = broadcast::channel(16);
        let upload_dir = std::env::temp_dir().join(format!("kopontren-api-{}", uuid::Uuid::now_v7()));
        let services = Services::new(
            store.clone(),
            Arc::new(Hs256Jwt::new(JWT_SECRET.as_bytes(), ChronoDuration::minutes(10))),
            Arc::new(StoreNotifier::new(store, realtime_tx.clone())),
            realtime_tx,
            ImageStore::new(upload_dir, 1024 * 1024),
            ServiceSettings::default(),
        );
        services.bootstrap_admin("admin", ADMIN_PASSWORD).await.unwrap();

        // Same router as prod, bound to an ephemeral port.
        let app = kopontren_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: "ghost".into(),
        role,
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_product(server: &TestServer, token: &str, code: &str, stock: i64) -> Value {
    let (status, body) = server
        .post(
            token,
            "/products",
            json!({
                "code": code,
                "name": format!("Semen {code}"),
                "unit": "sak",
                "buy_price": 60_000,
                "sell_price": 68_000,
                "min_stock": 5,
                "initial_stock": stock,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_is_public_and_everything_else_needs_a_token() {
    let server = TestServer::spawn().await;

    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = server.get("not-a-jwt", "/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_returns_profile() {
    let server = TestServer::spawn().await;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "username": "admin", "password": "salah" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = server.login("admin", ADMIN_PASSWORD).await;
    let (status, me) = server.get(&token, "/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["username"], "admin");
    assert_eq!(me["user"]["role"], "ADMIN");
    assert!(me["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn tokens_for_unknown_users_are_rejected() {
    let server = TestServer::spawn().await;

    // Valid signature, but the subject does not exist in the store.
    let forged = mint_jwt(JWT_SECRET, Role::Admin);
    let (status, _) = server.get(&forged, "/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_key = mint_jwt("other-secret", Role::Admin);
    let (status, _) = server.get(&wrong_key, "/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cashier_can_sell_but_not_receive_goods() {
    let server = TestServer::spawn().await;
    let admin = server.login("admin", ADMIN_PASSWORD).await;

    let (status, _) = server
        .post(
            &admin,
            "/users",
            json!({ "username": "kasir1", "full_name": "Kasir Satu", "role": "CASHIER", "password": "kasir123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cashier = server.login("kasir1", "kasir123").await;

    let product = create_product(&server, &admin, "SMN-01", 10).await;
    let (status, supplier) = server.post(&admin, "/suppliers", json!({ "name": "TB Sumber Rejeki" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, po) = server
        .post(
            &admin,
            "/purchase-orders",
            json!({
                "supplier_id": supplier["id"],
                "items": [{ "product_id": product["id"], "quantity": 20 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server
        .post(&cashier, &format!("/purchase-orders/{}/receive", po["id"].as_str().unwrap()), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = server.get(&cashier, "/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, trx) = server
        .post(
            &cashier,
            "/transactions",
            json!({
                "items": [{ "product_id": product["id"], "quantity": 2 }],
                "payment_type": "CASH",
                "paid_amount": 150_000,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{trx}");
    assert_eq!(trx["total"], 136_000);
    assert_eq!(trx["change_amount"], 14_000);

    let (_, after) = server.get(&admin, &format!("/products/{}", product["id"].as_str().unwrap())).await;
    assert_eq!(after["stock"], 8);
}

#[tokio::test]
async fn purchase_order_flow_books_stock_once() {
    let server = TestServer::spawn().await;
    let admin = server.login("admin", ADMIN_PASSWORD).await;

    let product = create_product(&server, &admin, "BSI-10", 4).await;
    let product_id = product["id"].as_str().unwrap().to_string();
    let (_, supplier) = server.post(&admin, "/suppliers", json!({ "name": "CV Baja Jaya" })).await;

    let (status, po) = server
        .post(
            &admin,
            "/purchase-orders",
            json!({
                "supplier_id": supplier["id"],
                "items": [{ "product_id": product_id, "quantity": 30, "unit_price": 62_000 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{po}");
    assert_eq!(po["status"], "DRAFT");
    assert!(po["number"].as_str().unwrap().starts_with("PO-"));
    let po_path = format!("/purchase-orders/{}", po["id"].as_str().unwrap());

    let (status, sent) = server.post(&admin, &format!("{po_path}/send"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "SENT");

    let (status, received) = server
        .post(
            &admin,
            &format!("{po_path}/receive"),
            json!({ "items": [{ "product_id": product_id, "quantity": 25 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{received}");
    assert_eq!(received["status"], "RECEIVED");

    let (status, again) = server.post(&admin, &format!("{po_path}/receive"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{again}");
    assert_eq!(again["error"], "invalid_state");

    let (_, after) = server.get(&admin, &format!("/products/{product_id}")).await;
    assert_eq!(after["stock"], 29);
    assert_eq!(after["buy_price"], 62_000);

    let (_, history) = server.get(&admin, &format!("/products/{product_id}/price-history")).await;
    assert_eq!(history["total"], 1);
    assert_eq!(history["items"][0]["source"], "PURCHASE_ORDER");

    let (_, movements) = server
        .get(&admin, &format!("/stock/movements?product_id={product_id}&reference_type=PURCHASE"))
        .await;
    assert_eq!(movements["total"], 1);
    assert_eq!(movements["items"][0]["quantity"], 25);

    let (_, audit) = server.get(&admin, "/audit-logs?action=RECEIVE").await;
    assert_eq!(audit["total"], 1);
}

#[tokio::test]
async fn validation_and_missing_rows_map_to_client_errors() {
    let server = TestServer::spawn().await;
    let admin = server.login("admin", ADMIN_PASSWORD).await;

    create_product(&server, &admin, "PKU-1", 0).await;
    let (status, body) = server
        .post(
            &admin,
            "/products",
            json!({ "code": "PKU-1", "name": "Paku lagi", "unit": "kg", "buy_price": 1, "sell_price": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = server.get(&admin, &format!("/products/{}", uuid::Uuid::now_v7())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = server.get(&admin, "/reports/sales?start=2026-03-10&end=2026-03-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, dashboard) = server.get(&admin, "/reports/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert!(dashboard.is_object());
}

#[tokio::test]
async fn product_image_upload_and_download() {
    let server = TestServer::spawn().await;
    let admin = server.login("admin", ADMIN_PASSWORD).await;
    let product = create_product(&server, &admin, "CAT-5", 3).await;

    let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3, 4];
    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(png.clone()).file_name("cat.png"),
    );
    let res = server
        .client
        .post(server.url(&format!("/products/{}/image", product["id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    let image = updated["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("products/") && image.ends_with(".png"));

    let res = server
        .client
        .get(server.url(&format!("/uploads/{image}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().to_vec(), png);

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(b"MZ".to_vec()).file_name("virus.exe"),
    );
    let res = server
        .client
        .post(server.url(&format!("/products/{}/image", product["id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
