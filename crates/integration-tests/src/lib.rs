//! Integration test harness for the fruit store.
//!
//! Tests drive the full storefront router in process with
//! `tower::ServiceExt::oneshot`: in-memory repositories, an in-memory session
//! store and a single cookie jar, so each [`TestApp`] behaves like one
//! browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fruit-store-integration-tests
//! ```

use std::collections::HashMap;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use fruit_store_storefront::config::StorefrontConfig;
use fruit_store_storefront::db::InMemoryDatabase;
use fruit_store_storefront::models::ProductInput;
use fruit_store_storefront::state::AppState;

/// Admin account every [`TestApp`] starts with.
pub const ADMIN_NAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "root-pass";

/// Storefront configuration for tests: memory storage, no rate limiting.
///
/// # Panics
///
/// Panics if the fixed variables fail to parse.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    let vars: HashMap<&str, &str> = [
        ("STOREFRONT_STORAGE", "memory"),
        ("STOREFRONT_RATE_LIMIT", "false"),
    ]
    .into_iter()
    .collect();
    StorefrontConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
        .expect("test configuration is valid")
}

/// One visitor talking to a fresh storefront.
pub struct TestApp {
    router: Router,
    state: AppState,
    cookie: Option<String>,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// A storefront with an admin account and an empty catalog.
    ///
    /// # Panics
    ///
    /// Panics if the admin account cannot be created.
    pub async fn new() -> Self {
        let state = AppState::in_memory(test_config(), InMemoryDatabase::new());
        state
            .auth()
            .create_admin(ADMIN_NAME, ADMIN_PASSWORD.to_owned())
            .await
            .expect("admin account is created");
        let router = fruit_store_storefront::app(state.clone(), tower_sessions::MemoryStore::default());
        Self {
            router,
            state,
            cookie: None,
        }
    }

    /// A second visitor on the same storefront, with its own cookie jar.
    #[must_use]
    pub fn other_visitor(&self) -> Self {
        Self {
            router: self.router.clone(),
            state: self.state.clone(),
            cookie: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Insert a catalog product directly and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the product is rejected.
    pub async fn seed_product(&self, title: &str, price: u32) -> i64 {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "title": title,
            "owner": "Orchard Co-op",
            "brand": "Orchard Fresh",
            "price": price,
            "images": [format!("{}.jpg", title.to_lowercase())],
            "description": format!("Fresh {title} picked this morning"),
            "category": "fruit",
            "rating": 4,
            "stock": 25,
            "warranty": "none",
        }))
        .expect("product input decodes");
        let product = self
            .state
            .catalog()
            .create(input)
            .await
            .expect("product is created");
        i64::from(product.id.as_i32())
    }

    /// Send a request, keeping the session cookie up to date.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON (empty bodies and
    /// plain text decode to `Value::Null` and `Value::String`).
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().trim();
            let removed = set_cookie.contains("Max-Age=0") || pair.ends_with('=');
            self.cookie = (!removed).then(|| pair.to_owned());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Register a customer and return their id.
    ///
    /// # Panics
    ///
    /// Panics unless signup answers 201.
    pub async fn signup(&mut self, name: &str, password: &str) -> i64 {
        let response = self
            .post(
                "/customers",
                serde_json::json!({ "name": name, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_i64().expect("id is a number")
    }

    /// Log in as a customer.
    ///
    /// # Panics
    ///
    /// Panics unless login answers 200.
    pub async fn login(&mut self, name: &str, password: &str) {
        let response = self
            .post(
                "/customers/login",
                serde_json::json!({ "name": name, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    /// Log in as the seeded admin.
    ///
    /// # Panics
    ///
    /// Panics unless login answers 200.
    pub async fn login_admin(&mut self) {
        let response = self
            .post(
                "/admin/login",
                serde_json::json!({ "name": ADMIN_NAME, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    /// Add `times` units of a product to the cart.
    ///
    /// # Panics
    ///
    /// Panics unless every add answers 200.
    pub async fn add_to_cart(&mut self, product_id: i64, times: u32) -> Value {
        let mut cart = Value::Null;
        for _ in 0..times {
            let response = self
                .post("/cart/items", serde_json::json!({ "productId": product_id }))
                .await;
            assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
            cart = response.body;
        }
        cart
    }
}

/// `(productId, quantity)` pairs of a cart view, sorted by product.
#[must_use]
pub fn quantities(cart: &Value) -> Vec<(i64, u64)> {
    let mut pairs: Vec<(i64, u64)> = cart["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some((item["product"]["id"].as_i64()?, item["quantity"].as_u64()?))
                })
                .collect()
        })
        .unwrap_or_default();
    pairs.sort_unstable();
    pairs
}
