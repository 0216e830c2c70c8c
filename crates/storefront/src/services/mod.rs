//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - customer signup/login with lazy credential migration, admin login
//! - `catalog` - products and reviews
//! - `customers` - customer lookup and saved addresses
//! - `orders` - order placement and the status lifecycle
//!
//! Services hold repository trait objects, so the same code runs against
//! `PostgreSQL` and the in-memory database.

pub mod auth;
pub mod catalog;
pub mod customers;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, CatalogService};
pub use customers::{CustomerError, CustomerService};
pub use orders::{OrderError, OrderService};
