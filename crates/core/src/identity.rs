//! Who is acting, and which cart they shop with.
//!
//! Two independent durable flags decide the actor: the `role` flag (admin)
//! and the `customerAuth` record. The admin flag wins when both are present.
//! Every transition rebinds the cart before anything reads it, so a caller
//! never sees another identity's cart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{self, CartEngine, CartError, CartKey, CartLine};
use crate::storage::{self, KeyValueStore, StorageError};
use crate::types::{ActorRole, ProductId, UserId, Username};

/// Durable storage keys shared by the server and the identity resolver.
pub mod keys {
    pub const CUSTOMER_AUTH: &str = "customerAuth";
    pub const ROLE: &str = "role";
    pub const CHECKOUT_FORM: &str = "checkoutForm";
    pub const REMEMBER_USER: &str = "rememberUser";
    /// Copy of the cart handed to the guest slot at logout.
    pub const CART_SEED: &str = "cartSeed";

    /// Value of [`ROLE`] for administrators.
    pub const ADMIN_ROLE: &str = "admin";
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// Administrators do not shop.
    #[error("administrators have no cart")]
    NoCart,
}

/// The logged-in customer record kept under `customerAuth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAuth {
    pub id: UserId,
    pub name: Username,
}

/// The current actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Guest,
    Customer { id: UserId, name: Username },
    Admin,
}

impl Actor {
    /// Cart namespace for this actor. `None` for admins.
    #[must_use]
    pub fn cart_key(&self) -> Option<CartKey> {
        match self {
            Self::Guest => Some(CartKey::Guest),
            Self::Customer { name, .. } => Some(CartKey::Customer(name.clone())),
            Self::Admin => None,
        }
    }

    /// Role used by the order transition table. Guests have none.
    #[must_use]
    pub const fn role(&self) -> Option<ActorRole> {
        match self {
            Self::Guest => None,
            Self::Customer { .. } => Some(ActorRole::Customer),
            Self::Admin => Some(ActorRole::Admin),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Customer { .. } => "customer",
            Self::Admin => "admin",
        }
    }
}

/// Quantities copied into the guest slot at logout, and whose cart they
/// came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CartSeed {
    owner: String,
    quantities: HashMap<ProductId, u32>,
}

impl CartSeed {
    fn from_lines(owner: &Username, lines: &[CartLine]) -> Self {
        Self {
            owner: owner.as_str().to_owned(),
            quantities: lines
                .iter()
                .map(|l| (l.product.id, l.quantity))
                .collect(),
        }
    }

    /// Guest lines minus what logout copied in, dropping lines that gained
    /// nothing.
    fn added_since(&self, guest: Vec<CartLine>) -> Vec<CartLine> {
        guest
            .into_iter()
            .filter_map(|mut line| {
                let seeded = self.quantities.get(&line.product.id).copied().unwrap_or(0);
                line.quantity = line.quantity.saturating_sub(seeded);
                (line.quantity > 0).then_some(line)
            })
            .collect()
    }
}

/// Resolves the actor from durable storage and drives identity transitions.
#[derive(Debug, Clone)]
pub struct IdentityResolver<S> {
    store: S,
}

impl<S: KeyValueStore + Clone> IdentityResolver<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The storage this resolver reads.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Current actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the flags cannot be read or the customer record is
    /// corrupt.
    pub async fn current(&self) -> Result<Actor, IdentityError> {
        if self.store.get(keys::ROLE).await?.as_deref() == Some(keys::ADMIN_ROLE) {
            return Ok(Actor::Admin);
        }
        let auth: Option<CustomerAuth> = storage::get_json(&self.store, keys::CUSTOMER_AUTH).await?;
        Ok(auth.map_or(Actor::Guest, |auth| Actor::Customer {
            id: auth.id,
            name: auth.name,
        }))
    }

    /// Resolve the actor and load the cart bound to them.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NoCart`] for admins, or a storage error.
    pub async fn bind_cart(&self) -> Result<(Actor, CartEngine<S>), IdentityError> {
        let actor = self.current().await?;
        let key = actor.cart_key().ok_or(IdentityError::NoCart)?;
        let cart = CartEngine::load(self.store.clone(), key).await?;
        Ok((actor, cart))
    }

    /// Log a customer in and hand their guest cart over.
    ///
    /// The guest cart is merged into the customer's durable cart (quantities
    /// add, new products append) and the guest record is deleted. When the
    /// guest slot still holds the copy this customer left at logout, only
    /// what was added since then is merged.
    ///
    /// Returns the cart bound to the customer.
    ///
    /// # Errors
    ///
    /// Returns a storage error; the customer is only recorded as logged in
    /// once the merged cart has been written.
    pub async fn login_customer(&self, auth: CustomerAuth) -> Result<CartEngine<S>, IdentityError> {
        let user_key = CartKey::Customer(auth.name.clone());
        let guest_lines = cart::read_lines(&self.store, &CartKey::Guest).await?;
        let seed: Option<CartSeed> = match storage::get_json(&self.store, keys::CART_SEED).await {
            Ok(seed) => seed,
            Err(StorageError::Corrupt { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let incoming = match seed {
            Some(seed) if seed.owner == auth.name.as_str() => seed.added_since(guest_lines),
            _ => guest_lines,
        };

        let mut cart = CartEngine::load(self.store.clone(), user_key).await?;
        if !incoming.is_empty() {
            let merged = cart::merge_lines(cart.lines().to_vec(), incoming);
            cart.replace(merged).await?;
        }

        self.store.delete(&CartKey::Guest.storage_key()).await?;
        self.store.delete(keys::CART_SEED).await?;
        storage::set_json(&self.store, keys::CUSTOMER_AUTH, &auth).await?;
        self.store.delete(keys::ROLE).await?;

        info!(customer = %auth.name, items = cart.item_count(), "customer logged in");
        Ok(cart)
    }

    /// Mark the actor as an administrator. Any customer identity is dropped.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn login_admin(&self) -> Result<(), IdentityError> {
        self.store.delete(keys::CUSTOMER_AUTH).await?;
        self.store
            .set(keys::ROLE, keys::ADMIN_ROLE.to_owned())
            .await?;
        info!("admin logged in");
        Ok(())
    }

    /// Drop the current identity and return the guest cart.
    ///
    /// A customer's cart is copied verbatim into the guest slot, overwriting
    /// whatever was there, and stays under its own key for the next login.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn logout(&self) -> Result<CartEngine<S>, IdentityError> {
        let actor = self.current().await?;
        if let Actor::Customer { name, .. } = &actor {
            let user_lines = cart::read_lines(&self.store, &CartKey::Customer(name.clone())).await?;
            storage::set_json(&self.store, &CartKey::Guest.storage_key(), &user_lines).await?;
            storage::set_json(
                &self.store,
                keys::CART_SEED,
                &CartSeed::from_lines(name, &user_lines),
            )
            .await?;
            debug!(customer = %name, lines = user_lines.len(), "seeded guest cart");
        }

        self.store.delete(keys::CUSTOMER_AUTH).await?;
        self.store.delete(keys::ROLE).await?;
        info!(actor = actor.kind(), "logged out");

        Ok(CartEngine::load(self.store.clone(), CartKey::Guest).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::storage::MemoryStorage;

    fn auth(id: i32, name: &str) -> CustomerAuth {
        CustomerAuth {
            id: UserId::new(id),
            name: Username::parse(name).unwrap(),
        }
    }

    fn quantities<S: KeyValueStore>(cart: &CartEngine<S>) -> Vec<(i32, u32)> {
        let mut q: Vec<(i32, u32)> = cart
            .lines()
            .iter()
            .map(|l| (l.product.id.as_i32(), l.quantity))
            .collect();
        q.sort_unstable();
        q
    }

    #[tokio::test]
    async fn test_defaults_to_guest() {
        let resolver = IdentityResolver::new(MemoryStorage::new());
        assert_eq!(resolver.current().await.unwrap(), Actor::Guest);
        let (_, cart) = resolver.bind_cart().await.unwrap();
        assert_eq!(cart.key(), &CartKey::Guest);
    }

    #[tokio::test]
    async fn test_admin_flag_wins_and_has_no_cart() {
        let store = MemoryStorage::new();
        storage::set_json(&store, keys::CUSTOMER_AUTH, &auth(1, "alice"))
            .await
            .unwrap();
        store.set(keys::ROLE, "admin".to_owned()).await.unwrap();
        let resolver = IdentityResolver::new(store);
        assert_eq!(resolver.current().await.unwrap(), Actor::Admin);
        assert!(matches!(
            resolver.bind_cart().await,
            Err(IdentityError::NoCart)
        ));
    }

    #[tokio::test]
    async fn test_login_merges_guest_into_user_cart() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());

        let mut user = CartEngine::load(store.clone(), CartKey::Customer(Username::parse("alice").unwrap()))
            .await
            .unwrap();
        user.add(product(1, 10)).await.unwrap();
        for _ in 0..3 {
            user.add(product(2, 10)).await.unwrap();
        }

        let (_, mut guest) = resolver.bind_cart().await.unwrap();
        guest.add(product(1, 10)).await.unwrap();
        guest.add(product(1, 10)).await.unwrap();

        let cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        assert_eq!(quantities(&cart), vec![(1, 3), (2, 3)]);
        assert!(!store.contains("cart_guest").await);
        assert_eq!(
            resolver.current().await.unwrap(),
            Actor::Customer {
                id: UserId::new(1),
                name: Username::parse("alice").unwrap()
            }
        );

        let (_, rebound) = resolver.bind_cart().await.unwrap();
        assert_eq!(quantities(&rebound), vec![(1, 3), (2, 3)]);
    }

    #[tokio::test]
    async fn test_logout_keeps_user_cart_and_seeds_guest() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());
        let mut cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        cart.add(product(5, 20)).await.unwrap();
        cart.add(product(5, 20)).await.unwrap();

        let guest = resolver.logout().await.unwrap();
        assert_eq!(guest.key(), &CartKey::Guest);
        assert_eq!(quantities(&guest), vec![(5, 2)]);
        assert_eq!(resolver.current().await.unwrap(), Actor::Guest);

        let user = CartEngine::load(store, CartKey::Customer(Username::parse("alice").unwrap()))
            .await
            .unwrap();
        assert_eq!(quantities(&user), vec![(5, 2)]);
    }

    #[tokio::test]
    async fn test_logout_overwrites_existing_guest_cart() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());
        let mut cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        cart.add(product(1, 20)).await.unwrap();
        let mut stale = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        stale.add(product(9, 1)).await.unwrap();

        let guest = resolver.logout().await.unwrap();
        assert_eq!(quantities(&guest), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_relogin_after_logout_does_not_double_count() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());
        let mut cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        cart.add(product(1, 20)).await.unwrap();

        let mut guest = resolver.logout().await.unwrap();
        guest.add(product(1, 20)).await.unwrap();
        guest.add(product(2, 20)).await.unwrap();

        let cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        assert_eq!(quantities(&cart), vec![(1, 2), (2, 1)]);
        assert!(!store.contains(keys::CART_SEED).await);
    }

    #[tokio::test]
    async fn test_seed_from_another_user_merges_in_full() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());
        let mut cart = resolver.login_customer(auth(1, "alice")).await.unwrap();
        cart.add(product(1, 20)).await.unwrap();
        resolver.logout().await.unwrap();

        let cart = resolver.login_customer(auth(2, "bob")).await.unwrap();
        assert_eq!(quantities(&cart), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_admin_login_and_logout() {
        let store = MemoryStorage::new();
        let resolver = IdentityResolver::new(store.clone());
        resolver.login_customer(auth(1, "alice")).await.unwrap();
        resolver.login_admin().await.unwrap();
        assert_eq!(resolver.current().await.unwrap(), Actor::Admin);
        assert!(!store.contains(keys::CUSTOMER_AUTH).await);

        resolver.logout().await.unwrap();
        assert_eq!(resolver.current().await.unwrap(), Actor::Guest);
    }
}
