//! Admin account management.
//!
//! Admin accounts are the only way to get the admin role; the server has no
//! built-in credentials.
//!
//! # Usage
//!
//! ```bash
//! fruit-store-cli admin create -n alice -p 's3cret-pass'
//! ```

use std::sync::Arc;

use thiserror::Error;

use fruit_store_storefront::db::PgStore;
use fruit_store_storefront::services::{AuthError, AuthService};

use super::ConnectError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Name or password rejected.
    #[error("Invalid admin account: {0}")]
    Invalid(String),

    /// Account already exists.
    #[error("Admin account already exists: {0}")]
    UserExists(String),

    #[error("Failed to create admin: {0}")]
    Auth(AuthError),
}

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the name or password is invalid, the name is taken,
/// or the database cannot be reached.
pub async fn create_user(name: &str, password: String) -> Result<(), AdminError> {
    let store = PgStore::new(super::connect().await?);
    let auth = AuthService::new(Arc::new(store.clone()), Arc::new(store));

    let admin = auth
        .create_admin(name, password)
        .await
        .map_err(|e| match e {
            AuthError::Validation(errors) => AdminError::Invalid(errors.to_string()),
            AuthError::UserAlreadyExists => AdminError::UserExists(name.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Name: {}",
        admin.id,
        admin.name
    );
    Ok(())
}
