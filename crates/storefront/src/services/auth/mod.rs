//! Authentication service.
//!
//! Customers sign up and log in with a name and password. Older accounts
//! still hold a plaintext password; the first successful login with one
//! replaces it by an Argon2id salt and hash. Administrators are separate,
//! hash-only accounts created from the CLI.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};

use fruit_store_core::Username;

use crate::db::{AdminRepository, RepositoryError, UserRepository};
use crate::models::user::check_password;
use crate::models::{AdminUser, Credential, FieldErrors, NewUser, SignupRequest, User};

/// Authentication service.
///
/// Handles customer registration and login, and admin login.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, admins: Arc<dyn AdminRepository>) -> Self {
        Self { users, admins }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for bad fields.
    /// Returns `AuthError::UserAlreadyExists` if the name is already registered.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register(&self, request: SignupRequest) -> Result<User, AuthError> {
        let draft = request.validate()?;
        let credential = hash_credential(&draft.password)?;

        let user = self
            .users
            .create(NewUser {
                name: draft.name,
                credential,
                email: draft.email,
                phone: draft.phone,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, customer = %user.name, "Customer registered");
        Ok(user)
    }

    /// Log a customer in.
    ///
    /// A legacy plaintext credential that matches is migrated to salt and
    /// hash before returning. A failed migration is logged and retried on
    /// the next login; it never fails the login itself.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the name is unknown, the
    /// account has no credential, or the password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, name: &str, password: &str) -> Result<User, AuthError> {
        let name = Username::parse(name).map_err(|_| AuthError::InvalidCredentials)?;
        let mut user = self
            .users
            .find_by_name(&name)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match user.credential.as_ref().ok_or(AuthError::InvalidCredentials)? {
            Credential::Hashed { hash, .. } => verify_password(password, hash)?,
            Credential::Legacy { password: stored } => {
                if !legacy_matches(stored, password) {
                    return Err(AuthError::InvalidCredentials);
                }
                let migrated = hash_credential(&SecretString::from(password))?;
                match self.users.set_credential(user.id, &migrated).await {
                    Ok(()) => {
                        info!(user_id = %user.id, "Migrated legacy credential");
                        user.credential = Some(migrated);
                    }
                    Err(e) => {
                        warn!(user_id = %user.id, error = %e, "Failed to migrate legacy credential");
                    }
                }
            }
        }

        Ok(user)
    }

    // =========================================================================
    // Administrators
    // =========================================================================

    /// Log an administrator in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the name/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login_admin(&self, name: &str, password: &str) -> Result<AdminUser, AuthError> {
        let name = Username::parse(name).map_err(|_| AuthError::InvalidCredentials)?;
        let admin = self
            .admins
            .find_by_name(&name)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &admin.password_hash)?;
        Ok(admin)
    }

    /// Create an administrator account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a bad name or short password.
    /// Returns `AuthError::UserAlreadyExists` if the name is taken.
    pub async fn create_admin(&self, name: &str, password: String) -> Result<AdminUser, AuthError> {
        let mut errors = FieldErrors::new();
        let name = errors.check("name", Username::parse(name));
        let password = check_password(&mut errors, password);
        let (Some(name), Some(password)) = (name, password) else {
            return Err(AuthError::Validation(errors));
        };

        let Credential::Hashed { hash, .. } = hash_credential(&password)? else {
            return Err(AuthError::PasswordHash);
        };

        let admin = self.admins.create(&name, &hash).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        info!(admin = %admin.name, "Administrator created");
        Ok(admin)
    }
}

/// Hash a password using Argon2id with a fresh salt.
fn hash_credential(password: &SecretString) -> Result<Credential, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|_| AuthError::PasswordHash)?;

    Ok(Credential::Hashed {
        salt: salt.as_str().to_owned(),
        hash: hash.to_string(),
    })
}

/// Verify a password against a PHC hash string.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Compare a legacy plaintext password in constant time.
fn legacy_matches(stored: &SecretString, password: &str) -> bool {
    stored
        .expose_secret()
        .as_bytes()
        .ct_eq(password.as_bytes())
        .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryDatabase;

    fn service(db: &InMemoryDatabase) -> AuthService {
        AuthService::new(Arc::new(db.clone()), Arc::new(db.clone()))
    }

    fn signup(name: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_owned(),
            password: password.to_owned(),
            ..SignupRequest::default()
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let db = InMemoryDatabase::new();
        let auth = service(&db);

        let user = auth.register(signup("Vivek", "secret1")).await.unwrap();
        assert_eq!(user.name.as_str(), "vivek");
        assert!(!user.credential.as_ref().unwrap().is_legacy());

        let logged_in = auth.login("VIVEK", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_is_case_insensitive() {
        let db = InMemoryDatabase::new();
        let auth = service(&db);

        auth.register(signup("vivek", "secret1")).await.unwrap();
        let err = auth.register(signup("Vivek", "secret2")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let db = InMemoryDatabase::new();
        let auth = service(&db);
        auth.register(signup("asha", "secret1")).await.unwrap();

        assert!(matches!(
            auth.login("asha", "nope").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            auth.login("nobody", "secret1").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            auth.login("", "secret1").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_legacy_credential_is_migrated_once() {
        let db = InMemoryDatabase::new();
        let auth = service(&db);
        let legacy = UserRepository::create(
            &db,
            NewUser {
                name: Username::parse("ravi").unwrap(),
                credential: Credential::Legacy {
                    password: SecretString::from("plain-old"),
                },
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            auth.login("ravi", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        let stored = UserRepository::get(&db, legacy.id).await.unwrap().unwrap();
        assert!(stored.credential.unwrap().is_legacy());

        auth.login("ravi", "plain-old").await.unwrap();
        let stored = UserRepository::get(&db, legacy.id).await.unwrap().unwrap();
        assert!(!stored.credential.unwrap().is_legacy());

        // Hashed path now verifies the same password.
        auth.login("ravi", "plain-old").await.unwrap();
    }

    #[test]
    fn test_legacy_comparison() {
        let stored = SecretString::from("plain-old");
        assert!(legacy_matches(&stored, "plain-old"));
        for attempt in ["plain-ole", "plain-old ", "plain", "", "PLAIN-OLD"] {
            assert!(!legacy_matches(&stored, attempt), "{attempt:?}");
        }
    }

    #[tokio::test]
    async fn test_admin_accounts() {
        let db = InMemoryDatabase::new();
        let auth = service(&db);

        assert!(matches!(
            auth.create_admin("root", "123".to_owned()).await.unwrap_err(),
            AuthError::Validation(_)
        ));
        auth.create_admin("root", "admin-pass".to_owned()).await.unwrap();
        assert!(matches!(
            auth.create_admin("ROOT", "admin-pass".to_owned()).await.unwrap_err(),
            AuthError::UserAlreadyExists
        ));

        let admin = auth.login_admin("root", "admin-pass").await.unwrap();
        assert_eq!(admin.name.as_str(), "root");
        assert!(auth.login_admin("root", "wrong").await.is_err());
        // Admin accounts are not customers.
        assert!(auth.login("root", "admin-pass").await.is_err());
    }
}
