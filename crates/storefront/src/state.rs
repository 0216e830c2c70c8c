//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    AdminRepository, InMemoryDatabase, OrderRepository, PgStore, ProductRepository, UserRepository,
};
use crate::services::{AuthService, CatalogService, CustomerService, OrderService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    auth: AuthService,
    catalog: CatalogService,
    customers: CustomerService,
    orders: OrderService,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::with_repositories(config, Some(pool.clone()), PgStore::new(pool))
    }

    /// State backed by process memory.
    #[must_use]
    pub fn in_memory(config: StorefrontConfig, db: InMemoryDatabase) -> Self {
        Self::with_repositories(config, None, db)
    }

    fn with_repositories<R>(config: StorefrontConfig, pool: Option<PgPool>, repos: R) -> Self
    where
        R: UserRepository + AdminRepository + ProductRepository + OrderRepository + Clone + 'static,
    {
        let users: Arc<dyn UserRepository> = Arc::new(repos.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth: AuthService::new(Arc::clone(&users), Arc::new(repos.clone())),
                catalog: CatalogService::new(Arc::new(repos.clone())),
                customers: CustomerService::new(users),
                orders: OrderService::new(Arc::new(repos)),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool; `None` for the in-memory backend.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn customers(&self) -> &CustomerService {
        &self.inner.customers
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
