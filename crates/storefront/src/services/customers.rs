//! Customer directory and saved addresses.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use fruit_store_core::identity::Actor;
use fruit_store_core::{AddressId, UserId, Username};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{AddressInput, FieldErrors, PublicUser, SavedAddress};

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Acting on another customer's account, or listing without being admin.
    #[error("not permitted")]
    Forbidden,

    #[error("customer or address not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CustomerError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

#[derive(Clone)]
pub struct CustomerService {
    users: Arc<dyn UserRepository>,
}

impl CustomerService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Look customers up by name.
    ///
    /// Admins see everyone, narrowed by a case-insensitive substring when
    /// `name` is given. Anyone else only learns whether exactly that name
    /// exists: the result is empty or holds the one match.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::Forbidden` when a non-admin omits `name`.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        actor: &Actor,
        name: Option<&str>,
    ) -> Result<Vec<PublicUser>, CustomerError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        if matches!(actor, Actor::Admin) {
            let users = self.users.list().await?;
            return Ok(users
                .into_iter()
                .filter(|u| name.is_none_or(|n| u.name.contains(n)))
                .map(PublicUser::from)
                .collect());
        }

        let name = name.ok_or(CustomerError::Forbidden)?;
        let Ok(name) = Username::parse(name) else {
            return Ok(Vec::new());
        };
        Ok(self
            .users
            .find_by_name(&name)
            .await?
            .map(PublicUser::from)
            .into_iter()
            .collect())
    }

    /// Saved addresses of a customer; readable by the owner and admins.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::Forbidden` for anyone else, or
    /// `CustomerError::NotFound` for an unknown customer.
    pub async fn addresses(
        &self,
        actor: &Actor,
        id: UserId,
    ) -> Result<Vec<SavedAddress>, CustomerError> {
        if !is_owner(actor, id) && !matches!(actor, Actor::Admin) {
            return Err(CustomerError::Forbidden);
        }
        let user = self.users.get(id).await?.ok_or(CustomerError::NotFound)?;
        Ok(user.addresses)
    }

    /// # Errors
    ///
    /// Returns `CustomerError::Forbidden` unless the actor owns the account,
    /// or `CustomerError::Validation` for bad fields.
    #[instrument(skip(self, input))]
    pub async fn add_address(
        &self,
        actor: &Actor,
        id: UserId,
        input: AddressInput,
    ) -> Result<Vec<SavedAddress>, CustomerError> {
        if !is_owner(actor, id) {
            return Err(CustomerError::Forbidden);
        }
        let address = input.validate()?;
        let addresses = self.users.add_address(id, address).await?;
        info!(user_id = %id, count = addresses.len(), "Address saved");
        Ok(addresses)
    }

    /// # Errors
    ///
    /// Returns `CustomerError::Forbidden` unless the actor owns the account,
    /// or `CustomerError::NotFound` for an unknown address.
    #[instrument(skip(self))]
    pub async fn remove_address(
        &self,
        actor: &Actor,
        id: UserId,
        address_id: AddressId,
    ) -> Result<Vec<SavedAddress>, CustomerError> {
        if !is_owner(actor, id) {
            return Err(CustomerError::Forbidden);
        }
        Ok(self.users.remove_address(id, address_id).await?)
    }
}

fn is_owner(actor: &Actor, id: UserId) -> bool {
    matches!(actor, Actor::Customer { id: own, .. } if *own == id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::InMemoryDatabase;
    use crate::models::{Credential, NewUser};

    async fn seed(db: &InMemoryDatabase, name: &str) -> Actor {
        let user = db
            .create(NewUser {
                name: Username::parse(name).unwrap(),
                credential: Credential::Legacy {
                    password: SecretString::from("secret1"),
                },
                email: None,
                phone: None,
            })
            .await
            .unwrap();
        Actor::Customer {
            id: user.id,
            name: user.name,
        }
    }

    fn home() -> AddressInput {
        AddressInput {
            label: None,
            address: "14 Orchard Lane".to_owned(),
            city: "Pune".to_owned(),
            pincode: "411001".to_owned(),
        }
    }

    fn id_of(actor: &Actor) -> UserId {
        match actor {
            Actor::Customer { id, .. } => *id,
            _ => panic!("not a customer"),
        }
    }

    #[tokio::test]
    async fn test_search_visibility() {
        let db = InMemoryDatabase::new();
        let service = CustomerService::new(Arc::new(db.clone()));
        seed(&db, "vivek").await;
        seed(&db, "vivian").await;

        let all = service.search(&Actor::Admin, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let viv = service.search(&Actor::Admin, Some("VIV")).await.unwrap();
        assert_eq!(viv.len(), 2);

        // Availability check is exact and case-insensitive.
        let taken = service.search(&Actor::Guest, Some("Vivek")).await.unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].name.as_str(), "vivek");
        assert!(service.search(&Actor::Guest, Some("viv")).await.unwrap().is_empty());
        assert!(matches!(
            service.search(&Actor::Guest, None).await,
            Err(CustomerError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_only_owner_mutates_addresses() {
        let db = InMemoryDatabase::new();
        let service = CustomerService::new(Arc::new(db.clone()));
        let asha = seed(&db, "asha").await;
        let ravi = seed(&db, "ravi").await;
        let asha_id = id_of(&asha);

        let saved = service.add_address(&asha, asha_id, home()).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].label, "Home");

        assert!(matches!(
            service.add_address(&ravi, asha_id, home()).await,
            Err(CustomerError::Forbidden)
        ));
        assert!(matches!(
            service.add_address(&Actor::Admin, asha_id, home()).await,
            Err(CustomerError::Forbidden)
        ));
        assert!(matches!(
            service.addresses(&ravi, asha_id).await,
            Err(CustomerError::Forbidden)
        ));
        assert_eq!(service.addresses(&Actor::Admin, asha_id).await.unwrap().len(), 1);

        let remaining = service
            .remove_address(&asha, asha_id, saved[0].id)
            .await
            .unwrap();
        assert!(remaining.is_empty());
        assert!(matches!(
            service.remove_address(&asha, asha_id, saved[0].id).await,
            Err(CustomerError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let db = InMemoryDatabase::new();
        let service = CustomerService::new(Arc::new(db.clone()));
        let asha = seed(&db, "asha").await;
        let err = service
            .add_address(&asha, id_of(&asha), AddressInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::Validation(_)));
    }
}
