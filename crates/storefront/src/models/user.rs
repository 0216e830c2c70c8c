//! Customer and admin account types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use fruit_store_core::{AddressId, AdminUserId, Email, PhoneNumber, Pincode, UserId, Username};

use super::validation::FieldErrors;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// How a customer's password is stored.
///
/// Exactly one representation is ever read back: when the salt and hash
/// columns are both set the plaintext column is ignored.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Plaintext password predating hashed storage. Replaced on first login.
    Legacy { password: SecretString },
    /// Argon2 salt and PHC hash string.
    Hashed { salt: String, hash: String },
}

impl Credential {
    /// Pick the representation from raw storage columns.
    #[must_use]
    pub fn from_columns(
        password: Option<String>,
        salt: Option<String>,
        hash: Option<String>,
    ) -> Option<Self> {
        match (salt, hash, password) {
            (Some(salt), Some(hash), _) => Some(Self::Hashed { salt, hash }),
            (_, _, Some(password)) => Some(Self::Legacy {
                password: SecretString::from(password),
            }),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: AddressId,
    pub label: String,
    pub address: String,
    pub city: String,
    pub pincode: Pincode,
}

/// A validated address to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub label: String,
    pub address: String,
    pub city: String,
    pub pincode: Pincode,
}

/// Body of `POST /customers/{id}/address`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    pub label: Option<String>,
    pub address: String,
    pub city: String,
    pub pincode: String,
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<NewAddress, FieldErrors> {
        let mut errors = FieldErrors::new();
        let label = self
            .label
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "Home".to_owned());
        let address = errors.required("address", "Address", &self.address);
        let city = errors.required("city", "City", &self.city);
        let pincode = errors.check("pincode", Pincode::parse(&self.pincode));

        match (address, city, pincode) {
            (Some(address), Some(city), Some(pincode)) => Ok(NewAddress {
                label,
                address,
                city,
                pincode,
            }),
            _ => Err(errors),
        }
    }
}

/// A customer account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: Username,
    pub credential: Option<Credential>,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub addresses: Vec<SavedAddress>,
    pub created_at: DateTime<Utc>,
}

/// A customer as returned over HTTP. Credential fields never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: Username,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub addresses: Vec<SavedAddress>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            addresses: user.addresses,
            created_at: user.created_at,
        }
    }
}

/// A validated customer to insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Username,
    pub credential: Credential,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
}

/// Body of `POST /customers`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Signup fields after validation; the password is not hashed yet.
#[derive(Debug)]
pub struct SignupDraft {
    pub name: Username,
    pub password: SecretString,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
}

impl SignupRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<SignupDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.check("name", Username::parse(&self.name));
        let password = check_password(&mut errors, self.password);
        let email = optional(self.email).map(|e| errors.check("email", Email::parse(&e)));
        let phone = optional(self.phone).map(|p| errors.check("phone", PhoneNumber::parse(&p)));

        match (name, password) {
            (Some(name), Some(password)) if errors.is_empty() => Ok(SignupDraft {
                name,
                password,
                email: email.flatten(),
                phone: phone.flatten(),
            }),
            _ => Err(errors),
        }
    }
}

/// Password of at least [`MIN_PASSWORD_LENGTH`] characters.
pub(crate) fn check_password(errors: &mut FieldErrors, password: String) -> Option<SecretString> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
        return None;
    }
    Some(SecretString::from(password))
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// An administrator account.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub name: Username,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
