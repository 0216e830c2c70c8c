//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS (only when allowed origins are configured)
//! 3. `TraceLayer` (`http_request` span)
//! 4. Request ID (recorded on that span)
//! 5. Session layer (tower-sessions)
//! 6. Rate limiting (governor) on signup and login routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, Visitor};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use session::{SessionStorage, create_session_layer};
