//! `PostgreSQL` customer repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;

use fruit_store_core::{AddressId, Email, PhoneNumber, Pincode, UserId, Username};

use super::{PgStore, RepositoryError, UserRepository, conflict_on_unique};
use crate::models::{Credential, NewAddress, NewUser, SavedAddress, User};

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    name: String,
    password: Option<String>,
    salt: Option<String>,
    password_hash: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i32,
    customer_id: i32,
    label: String,
    address: String,
    city: String,
    pincode: String,
}

impl AddressRow {
    fn into_address(self) -> Result<SavedAddress, RepositoryError> {
        let pincode = Pincode::parse(&self.pincode).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid pincode in database: {e}"))
        })?;
        Ok(SavedAddress {
            id: AddressId::new(self.id),
            label: self.label,
            address: self.address,
            city: self.city,
            pincode,
        })
    }
}

impl CustomerRow {
    fn into_user(self, addresses: Vec<SavedAddress>) -> Result<User, RepositoryError> {
        let name = Username::parse(&self.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid customer name in database: {e}"))
        })?;
        let email = self
            .email
            .map(|e| Email::parse(&e))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;
        let phone = self
            .phone
            .map(|p| PhoneNumber::parse(&p))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid phone in database: {e}")))?;

        Ok(User {
            id: UserId::new(self.id),
            name,
            credential: Credential::from_columns(self.password, self.salt, self.password_hash),
            email,
            phone,
            addresses,
            created_at: self.created_at,
        })
    }
}

impl PgStore {
    async fn addresses_of(&self, id: UserId) -> Result<Vec<SavedAddress>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, label, address, city, pincode
            FROM storefront.customer_address
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AddressRow::into_address).collect()
    }

    async fn with_addresses(&self, row: Option<CustomerRow>) -> Result<Option<User>, RepositoryError> {
        match row {
            Some(row) => {
                let addresses = self.addresses_of(UserId::new(row.id)).await?;
                row.into_user(addresses).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let (password, salt, hash) = match &user.credential {
            Credential::Legacy { password } => (Some(password.expose_secret()), None, None),
            Credential::Hashed { salt, hash } => (None, Some(salt.as_str()), Some(hash.as_str())),
        };

        let row: CustomerRow = sqlx::query_as(
            r"
            INSERT INTO storefront.customer (name, password, salt, password_hash, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, password, salt, password_hash, email, phone, created_at
            ",
        )
        .bind(&user.name)
        .bind(password)
        .bind(salt)
        .bind(hash)
        .bind(user.email.as_ref().map(Email::as_str))
        .bind(user.phone.as_ref().map(PhoneNumber::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("name already exists"))?;

        row.into_user(Vec::new())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            SELECT id, name, password, salt, password_hash, email, phone, created_at
            FROM storefront.customer
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_addresses(row).await
    }

    async fn find_by_name(&self, name: &Username) -> Result<Option<User>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            SELECT id, name, password, salt, password_hash, email, phone, created_at
            FROM storefront.customer
            WHERE LOWER(name) = LOWER($1)
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        self.with_addresses(row).await
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            r"
            SELECT id, name, password, salt, password_hash, email, phone, created_at
            FROM storefront.customer
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let address_rows: Vec<AddressRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, label, address, city, pincode
            FROM storefront.customer_address
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_customer: HashMap<i32, Vec<SavedAddress>> = HashMap::new();
        for row in address_rows {
            let customer_id = row.customer_id;
            by_customer
                .entry(customer_id)
                .or_default()
                .push(row.into_address()?);
        }

        rows.into_iter()
            .map(|row| {
                let addresses = by_customer.remove(&row.id).unwrap_or_default();
                row.into_user(addresses)
            })
            .collect()
    }

    async fn set_credential(
        &self,
        id: UserId,
        credential: &Credential,
    ) -> Result<(), RepositoryError> {
        let result = match credential {
            Credential::Hashed { salt, hash } => {
                sqlx::query(
                    r"
                    UPDATE storefront.customer
                    SET salt = $2, password_hash = $3, password = NULL, updated_at = NOW()
                    WHERE id = $1
                    ",
                )
                .bind(id)
                .bind(salt)
                .bind(hash)
                .execute(&self.pool)
                .await?
            }
            Credential::Legacy { password } => {
                sqlx::query(
                    r"
                    UPDATE storefront.customer
                    SET password = $2, salt = NULL, password_hash = NULL, updated_at = NOW()
                    WHERE id = $1
                    ",
                )
                .bind(id)
                .bind(password.expose_secret())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn add_address(
        &self,
        id: UserId,
        address: NewAddress,
    ) -> Result<Vec<SavedAddress>, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.customer_address (customer_id, label, address, city, pincode)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(&address.label)
        .bind(&address.address)
        .bind(&address.city)
        .bind(address.pincode.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        self.addresses_of(id).await
    }

    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<Vec<SavedAddress>, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.customer_address
            WHERE id = $1 AND customer_id = $2
            ",
        )
        .bind(address_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.addresses_of(id).await
    }
}
