//! In-memory implementation of every repository.
//!
//! Used by tests and by `STOREFRONT_STORAGE=memory`. Enforces the same
//! constraints as the `PostgreSQL` schema: case-insensitive unique names,
//! compare-and-set status updates.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use fruit_store_core::{
    AddressId, AdminUserId, OrderId, OrderStatus, ProductId, UserId, Username,
};

use super::{AdminRepository, OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{
    AdminUser, Credential, NewAddress, NewOrder, NewUser, Order, Product, ProductDraft, Review,
    SavedAddress, User,
};

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<UserId, User>,
    admins: BTreeMap<AdminUserId, AdminUser>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    last_id: i32,
}

impl Tables {
    /// One sequence for every table; ids only need to be unique per table.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

/// Shared in-process database. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
    orders
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.customers.values().any(|u| u.name == user.name) {
            return Err(RepositoryError::Conflict("name already exists".to_owned()));
        }
        let id = UserId::new(tables.next_id());
        let created = User {
            id,
            name: user.name,
            credential: Some(user.credential),
            email: user.email,
            phone: user.phone,
            addresses: Vec::new(),
            created_at: Utc::now(),
        };
        tables.customers.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &Username) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .customers
            .values()
            .find(|u| &u.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn set_credential(
        &self,
        id: UserId,
        credential: &Credential,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .customers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        user.credential = Some(credential.clone());
        Ok(())
    }

    async fn add_address(
        &self,
        id: UserId,
        address: NewAddress,
    ) -> Result<Vec<SavedAddress>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let address_id = AddressId::new(tables.next_id());
        let user = tables
            .customers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        user.addresses.push(SavedAddress {
            id: address_id,
            label: address.label,
            address: address.address,
            city: address.city,
            pincode: address.pincode,
        });
        Ok(user.addresses.clone())
    }

    async fn remove_address(
        &self,
        id: UserId,
        address_id: AddressId,
    ) -> Result<Vec<SavedAddress>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .customers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        let before = user.addresses.len();
        user.addresses.retain(|a| a.id != address_id);
        if user.addresses.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(user.addresses.clone())
    }
}

#[async_trait]
impl AdminRepository for InMemoryDatabase {
    async fn create(
        &self,
        name: &Username,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.admins.values().any(|a| &a.name == name) {
            return Err(RepositoryError::Conflict(
                "admin name already exists".to_owned(),
            ));
        }
        let id = AdminUserId::new(tables.next_id());
        let admin = AdminUser {
            id,
            name: name.clone(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        tables.admins.insert(id, admin.clone());
        Ok(admin)
    }

    async fn find_by_name(&self, name: &Username) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .admins
            .values()
            .find(|a| &a.name == name)
            .cloned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryDatabase {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_id());
        let product = Product {
            id,
            title: draft.title,
            owner: draft.owner,
            brand: draft.brand,
            price: draft.price,
            images: draft.images,
            description: draft.description,
            category: draft.category,
            rating: draft.rating,
            stock: draft.stock,
            warranty: draft.warranty,
            reviews: Vec::new(),
            created_at: Utc::now(),
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.title = draft.title;
        product.owner = draft.owner;
        product.brand = draft.brand;
        product.price = draft.price;
        product.images = draft.images;
        product.description = draft.description;
        product.category = draft.category;
        product.rating = draft.rating;
        product.stock = draft.stock;
        product.warranty = draft.warranty;
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn append_review(&self, id: ProductId, review: Review) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.reviews.push(review);
        Ok(product.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryDatabase {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&order.user_id) {
            return Err(RepositoryError::Conflict(format!(
                "customer {} does not exist",
                order.user_id
            )));
        }
        let id = OrderId::new(tables.next_id());
        let order = order.into_order(id);
        tables.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.tables.read().await.orders.values().cloned().collect();
        Ok(newest_first(orders))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self
            .tables
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is {} now, not {expected}",
                order.status
            )));
        }
        order.status = status;
        Ok(order.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::models::product::tests::mango_input;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: Username::parse(name).unwrap(),
            credential: Credential::Legacy {
                password: SecretString::from("secret1"),
            },
            email: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_names_are_unique_case_insensitively() {
        let db = InMemoryDatabase::new();
        UserRepository::create(&db, new_user("Vivek")).await.unwrap();
        let err = UserRepository::create(&db, new_user("vivek")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let found = UserRepository::find_by_name(&db, &Username::parse("VIVEK").unwrap())
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_addresses() {
        let db = InMemoryDatabase::new();
        let user = UserRepository::create(&db, new_user("asha")).await.unwrap();
        let address = NewAddress {
            label: "Home".to_owned(),
            address: "42 Market Street".to_owned(),
            city: "Pune".to_owned(),
            pincode: fruit_store_core::Pincode::parse("411001").unwrap(),
        };
        let list = db.add_address(user.id, address.clone()).await.unwrap();
        assert_eq!(list.len(), 1);
        let list = db.add_address(user.id, address).await.unwrap();
        assert_eq!(list.len(), 2);

        let remaining = db.remove_address(user.id, list[0].id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(matches!(
            db.remove_address(user.id, list[0].id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_product_update_keeps_reviews() {
        let db = InMemoryDatabase::new();
        let product = ProductRepository::create(&db, mango_input().validate().unwrap())
            .await
            .unwrap();
        let review = Review {
            user: "asha".to_owned(),
            comment: "Very sweet".to_owned(),
            rating: fruit_store_core::Rating::new(5.into()).unwrap(),
        };
        db.append_review(product.id, review).await.unwrap();

        let mut draft = mango_input().validate().unwrap();
        draft.title = "Kesar Mango".to_owned();
        let updated = db.update(product.id, draft).await.unwrap();
        assert_eq!(updated.title, "Kesar Mango");
        assert_eq!(updated.reviews.len(), 1);

        ProductRepository::delete(&db, product.id).await.unwrap();
        assert!(matches!(
            ProductRepository::delete(&db, product.id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
