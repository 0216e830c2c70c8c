//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Database ping
//!
//! # Identity
//! GET    /session                        - Current actor
//! POST   /customers/login                - Customer login (rate limited)
//! GET    /customers/login/remembered     - Remembered username
//! POST   /admin/login                    - Admin login (rate limited)
//! POST   /logout                         - Logout
//!
//! # Customers
//! POST   /customers                      - Signup (rate limited)
//! GET    /customers?name=                - Lookup
//! GET    /customers/{id}/address         - Saved addresses (alias /addresses)
//! POST   /customers/{id}/address         - Save address
//! DELETE /customers/{id}/address/{addrId}
//!
//! # Catalog
//! GET    /products?q=                    - List and search
//! GET    /products/{id}
//! POST   /products                       - Create (admin)
//! PUT    /products/{id}                  - Review (anyone) or full edit (admin)
//! DELETE /products/{id}                  - Delete (admin)
//!
//! # Cart (bound to the session's identity)
//! GET    /cart
//! POST   /cart/items                     - Add one unit
//! POST   /cart/items/{productId}/decrease
//! DELETE /cart/items/{productId}
//! DELETE /cart
//!
//! # Checkout and orders
//! GET    /checkout/draft
//! PUT    /checkout/draft
//! POST   /orders                         - Place from the bound cart
//! GET    /orders?q=                      - All orders (admin)
//! GET    /orders/user/{userId}
//! PUT    /orders/{id}                    - Status change
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod customers;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{MethodRouter, delete, get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Wrap credential endpoints in the per-IP limiter when enabled.
fn limited(route: MethodRouter<AppState>, enabled: bool) -> MethodRouter<AppState> {
    if enabled {
        route.layer(auth_rate_limiter())
    } else {
        route
    }
}

/// Identity routes.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/session", get(auth::session))
        .route("/customers/login", limited(post(auth::login), rate_limit))
        .route("/customers/login/remembered", get(auth::remembered))
        .route("/admin/login", limited(post(auth::admin_login), rate_limit))
        .route("/logout", post(auth::logout))
}

/// Customer account routes.
pub fn customer_routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(customers::search).merge(limited(post(customers::signup), rate_limit)),
        )
        .route(
            "/{id}/address",
            get(customers::addresses).post(customers::add_address),
        )
        .route("/{id}/addresses", get(customers::addresses))
        .route("/{id}/address/{addr_id}", delete(customers::remove_address))
}

/// Product catalog routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{product_id}", delete(cart::remove))
        .route("/items/{product_id}/decrease", post(cart::decrease))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/user/{user_id}", get(orders::for_user))
        .route("/{id}", put(orders::update_status))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes(rate_limit))
        .nest("/customers", customer_routes(rate_limit))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route(
            "/checkout/draft",
            get(checkout::show).put(checkout::save),
        )
        .nest("/orders", order_routes())
}
