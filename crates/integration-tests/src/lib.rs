//! End-to-end tests for the thrift store API.
//!
//! Each test drives the real router with `tower::ServiceExt::oneshot` over
//! the in-memory repositories and an in-memory session store. No database
//! or network is needed:
//!
//! ```bash
//! cargo test -p thriftstore-integration-tests
//! ```
//!
//! [`TestApp`] keeps the session cookie between requests, so a test reads
//! like one browser session.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use thriftstore_core::{ProductCondition, ProductStatus, UserRole};
use thriftstore_server::config::ServerConfig;
use thriftstore_server::db::Stores;
use thriftstore_server::middleware::{SESSION_COOKIE_NAME, create_session_layer};
use thriftstore_server::models::{Product, ProductForm, User, UserForm};
use thriftstore_server::services::{CatalogService, UserService, slugify};
use thriftstore_server::state::AppState;

/// Password given to every account created by [`TestApp::staff`].
pub const TEST_PASSWORD: &str = "correct horse battery";

/// A router plus the cookie of the current session.
pub struct TestApp {
    router: Router,
    state: AppState,
    cookie: Option<String>,
}

/// Status, headers and body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let config = ServerConfig::local();
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let state = AppState::new(config, Stores::memory()).expect("state builds");
        let router = thriftstore_server::build_app(state.clone(), session_layer);
        Self {
            router,
            state,
            cookie: None,
        }
    }

    pub fn stores(&self) -> &Stores {
        self.state.stores()
    }

    /// A fresh browser on the same server: shared data, no session.
    #[must_use]
    pub fn new_session(&self) -> Self {
        Self {
            router: self.router.clone(),
            state: self.state.clone(),
            cookie: None,
        }
    }

    pub async fn request(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        self.remember_cookie(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    fn remember_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else { continue };
            let Some((name, token)) = pair.split_once('=') else { continue };
            if name.trim() != SESSION_COOKIE_NAME {
                continue;
            }
            self.cookie = (!token.is_empty()).then(|| pair.to_owned());
        }
    }

    /// Create an active account with [`TEST_PASSWORD`].
    pub async fn staff(&self, email: &str, role: UserRole) -> User {
        let stores = self.stores();
        UserService::new(stores.users.as_ref(), stores.orders.as_ref())
            .create_staff(UserForm {
                name: format!("Test {role}"),
                email: email.to_owned(),
                phone: None,
                password: TEST_PASSWORD.to_owned(),
                role,
            })
            .await
            .expect("staff account is valid")
    }

    /// Create an account and sign this session in as it.
    pub async fn sign_in_as(&mut self, email: &str, role: UserRole) -> User {
        let user = self.staff(email, role).await;
        let response = self
            .post(
                "/api/auth/login",
                json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        user
    }

    /// An active product priced in whole shillings, with barcode `TEST-<slug>`.
    pub async fn product(&self, name: &str, price: i64) -> Product {
        let stores = self.stores();
        CatalogService::new(stores.catalog.as_ref(), stores.orders.as_ref())
            .create_product(ProductForm {
                name: name.to_owned(),
                description: None,
                price: Decimal::from(price),
                original_price: None,
                category_id: None,
                sub_category_id: None,
                condition: ProductCondition::Good,
                barcode: Some(format!("TEST-{}", slugify(name))),
                status: Some(ProductStatus::Active),
                tags: Vec::new(),
                images: Vec::new(),
                featured: false,
            })
            .await
            .expect("product is valid")
    }
}

/// Checkout details for a Nairobi delivery paid by M-Pesa.
pub fn checkout_body() -> Value {
    json!({
        "customer_name": "Wanjiku Kamau",
        "email": "wanjiku@example.com",
        "phone": "0712 345 678",
        "shipping": {
            "address_line": "12 Moi Avenue",
            "city": "Nairobi",
            "region": "Nairobi",
            "postal_code": "00100"
        },
        "payment_method": "mpesa"
    })
}
