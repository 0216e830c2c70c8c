//! Persistence for customers, admins, products and orders.
//!
//! Services talk to the repository traits below. Two backends implement
//! them:
//!
//! - [`PgStore`] - `PostgreSQL`, one file per table group (`users`, `admins`,
//!   `products`, `orders`)
//! - [`InMemoryDatabase`] - process memory, for tests and `STOREFRONT_STORAGE=memory`
//!
//! ## Tables (schema `storefront`)
//!
//! - `customer` - accounts, with legacy plaintext or salt/hash credentials
//! - `customer_address` - saved delivery addresses
//! - `admin_user` - administrator accounts
//! - `product` - catalog, reviews embedded as JSONB
//! - `customer_order` - orders, items embedded as JSONB
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p fruit-store-cli -- migrate
//! ```

mod admins;
pub mod memory;
mod orders;
mod products;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use fruit_store_core::{
    AddressId, OrderId, OrderStatus, ProductId, UserId, Username,
};

use crate::models::{
    AdminUser, Credential, NewAddress, NewOrder, NewUser, Order, Product, ProductDraft, Review,
    SavedAddress, User,
};

pub use memory::InMemoryDatabase;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost compare-and-set.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Customer accounts and their saved addresses.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken (case-insensitively).
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_name(&self, name: &Username) -> Result<Option<User>, RepositoryError>;

    /// Every customer, oldest first.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Replace the stored credential. Writing a hashed credential clears any
    /// legacy plaintext.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    async fn set_credential(&self, id: UserId, credential: &Credential)
    -> Result<(), RepositoryError>;

    /// Append an address and return the full list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    async fn add_address(
        &self,
        id: UserId,
        address: NewAddress,
    ) -> Result<Vec<SavedAddress>, RepositoryError>;

    /// Remove an address and return the remaining list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer or address does not exist.
    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<Vec<SavedAddress>, RepositoryError>;
}

/// Administrator accounts.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    async fn create(&self, name: &Username, password_hash: &str)
    -> Result<AdminUser, RepositoryError>;

    async fn find_by_name(&self, name: &Username) -> Result<Option<AdminUser>, RepositoryError>;
}

/// The product catalog.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every product, oldest first.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Full edit. Reviews are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;

    /// Append one review atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn append_review(&self, id: ProductId, review: Review) -> Result<Product, RepositoryError>;
}

/// Placed orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Every order, most recent first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// One customer's orders, most recent first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Set the status if it is still `expected`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if its status is no longer `expected`.
    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

/// `PostgreSQL` implementation of every repository.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
