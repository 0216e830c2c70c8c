//! Session middleware configuration and the session-backed key-value store.
//!
//! The session is the visitor's durable storage scope: cart records, the
//! logged-in customer and the admin flag all live in it as string values.

use async_trait::async_trait;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use fruit_store_core::storage::{KeyValueStore, StorageError};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "fruit_session";

/// Create the session layer over `store`.
///
/// Production passes a `PostgresStore` (its table is created by the
/// storefront migration); tests pass a `MemoryStore`.
#[must_use]
pub fn create_session_layer<Store>(store: Store, config: &StorefrontConfig) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::days(config.session_days),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// [`KeyValueStore`] over one visitor's session.
///
/// Clones share the same session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn backend(e: tower_sessions::session::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl KeyValueStore for SessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.session.get::<String>(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session.insert(key, value).await.map_err(backend)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.session
            .remove_value(key)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn storage() -> SessionStorage {
        SessionStorage::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_round_trips_strings() {
        let store = storage();
        assert_eq!(store.get("cart_guest").await.unwrap(), None);

        store.set("cart_guest", "[]".to_owned()).await.unwrap();
        assert_eq!(store.get("cart_guest").await.unwrap().as_deref(), Some("[]"));

        // Clones see the same session.
        let other = store.clone();
        other.delete("cart_guest").await.unwrap();
        assert_eq!(store.get("cart_guest").await.unwrap(), None);
        other.delete("cart_guest").await.unwrap();
    }
}
