//! Per-identity shopping cart.
//!
//! A cart is a list of lines, one per product, persisted as JSON under
//! `cart_<identityKey>` after every mutation. A line's quantity is always at
//! least one; taking away the last unit removes the line.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{self, KeyValueStore, StorageError};
use crate::types::{Price, ProductId, Username};

/// Errors raised by the cart engine.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// `decrease` or `remove` named a product with no line in the cart.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// The cart total would overflow.
    #[error("cart total is too large")]
    TotalOverflow,
}

/// Namespace of a durable cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartKey {
    Guest,
    Customer(Username),
}

impl CartKey {
    /// `guest` or the customer's canonical name.
    #[must_use]
    pub fn identity(&self) -> &str {
        match self {
            Self::Guest => Username::GUEST,
            Self::Customer(name) => name.as_str(),
        }
    }

    /// Storage key holding this cart.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("cart_{}", self.identity())
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identity())
    }
}

/// The product fields a cart line keeps, frozen when first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartLine {
    /// Price times quantity, `None` on overflow.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.product.price.times(self.quantity)
    }
}

/// Fold `incoming` into `base`: matching products add quantities, new
/// products are appended in their incoming order.
#[must_use]
pub fn merge_lines(mut base: Vec<CartLine>, incoming: Vec<CartLine>) -> Vec<CartLine> {
    for line in incoming {
        if line.quantity == 0 {
            continue;
        }
        match base.iter_mut().find(|l| l.product.id == line.product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => base.push(line),
        }
    }
    base
}

/// Sum of price times quantity, `None` on overflow.
#[must_use]
pub fn total_of(lines: &[CartLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.subtotal()?))
}

/// Read the cart stored under `key`, dropping zero-quantity lines.
///
/// A corrupt record, or one whose total overflows, loads as an empty cart.
///
/// # Errors
///
/// Returns a backend [`StorageError`].
pub async fn read_lines<S>(store: &S, key: &CartKey) -> Result<Vec<CartLine>, StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let storage_key = key.storage_key();
    match storage::get_json::<Vec<CartLine>, _>(store, &storage_key).await {
        Ok(lines) => {
            let lines: Vec<CartLine> = lines
                .unwrap_or_default()
                .into_iter()
                .filter(|line| line.quantity > 0)
                .collect();
            if total_of(&lines).is_none() {
                warn!(key = %storage_key, "discarding cart whose total overflows");
                return Ok(Vec::new());
            }
            Ok(lines)
        }
        Err(StorageError::Corrupt { source, .. }) => {
            warn!(key = %storage_key, error = %source, "discarding unreadable cart");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// The cart bound to one identity key.
///
/// Every mutation writes the whole cart back before updating the in-memory
/// copy, so a failed write leaves the engine unchanged. A cart whose total
/// cannot be computed is never written.
#[derive(Debug)]
pub struct CartEngine<S> {
    store: S,
    key: CartKey,
    lines: Vec<CartLine>,
    total: Decimal,
}

impl<S: KeyValueStore> CartEngine<S> {
    /// Bind to `key` and load its durable cart (empty if none).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: S, key: CartKey) -> Result<Self, CartError> {
        let lines = read_lines(&store, &key).await?;
        let total = priced(&lines)?;
        Ok(Self {
            store,
            key,
            lines,
            total,
        })
    }

    /// Switch to `key`, replacing in-memory state with its durable cart.
    ///
    /// Calling this again with the current key just reloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read; the engine keeps its
    /// previous binding in that case.
    pub async fn set_identity(&mut self, key: CartKey) -> Result<(), CartError> {
        let lines = read_lines(&self.store, &key).await?;
        self.total = priced(&lines)?;
        self.key = key;
        self.lines = lines;
        Ok(())
    }

    #[must_use]
    pub const fn key(&self) -> &CartKey {
        &self.key
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.product.id == id)
            .map(|l| l.quantity)
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Add one unit. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TotalOverflow`] if the total would overflow, or
    /// an error if the cart cannot be persisted. The cart is unchanged
    /// either way.
    pub async fn add(&mut self, product: ProductSnapshot) -> Result<u32, CartError> {
        let mut lines = self.lines.clone();
        let quantity = match lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(1);
                line.quantity
            }
            None => {
                lines.push(CartLine {
                    product,
                    quantity: 1,
                });
                1
            }
        };
        self.commit(lines).await?;
        Ok(quantity)
    }

    /// Take away one unit. Returns the remaining quantity, or `None` when
    /// the line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product has no line, or a
    /// storage error.
    pub async fn decrease(&mut self, id: ProductId) -> Result<Option<u32>, CartError> {
        let mut lines = self.lines.clone();
        let pos = lines
            .iter()
            .position(|l| l.product.id == id)
            .ok_or(CartError::LineNotFound(id))?;
        let remaining = lines.get(pos).map_or(0, |l| l.quantity.saturating_sub(1));
        if remaining == 0 {
            lines.remove(pos);
        } else if let Some(line) = lines.get_mut(pos) {
            line.quantity = remaining;
        }
        self.commit(lines).await?;
        Ok((remaining > 0).then_some(remaining))
    }

    /// Delete a line regardless of quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product has no line, or a
    /// storage error.
    pub async fn remove(&mut self, id: ProductId) -> Result<CartLine, CartError> {
        let mut lines = self.lines.clone();
        let pos = lines
            .iter()
            .position(|l| l.product.id == id)
            .ok_or(CartError::LineNotFound(id))?;
        let removed = lines.remove(pos);
        self.commit(lines).await?;
        Ok(removed)
    }

    /// Empty the cart and delete its durable record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be deleted.
    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.store.delete(&self.key.storage_key()).await?;
        self.lines.clear();
        self.total = Decimal::ZERO;
        Ok(())
    }

    /// Persist `lines` as the whole cart.
    pub(crate) async fn replace(&mut self, lines: Vec<CartLine>) -> Result<(), CartError> {
        self.commit(lines).await
    }

    async fn commit(&mut self, lines: Vec<CartLine>) -> Result<(), CartError> {
        let total = priced(&lines)?;
        storage::set_json(&self.store, &self.key.storage_key(), &lines).await?;
        self.lines = lines;
        self.total = total;
        Ok(())
    }
}

fn priced(lines: &[CartLine]) -> Result<Decimal, CartError> {
    total_of(lines).ok_or(CartError::TotalOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::storage::MemoryStorage;

    pub(crate) fn product(id: i32, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            title: format!("Fruit {id}"),
            price: Price::new(Decimal::from(price)).unwrap(),
            image: None,
        }
    }

    fn alice() -> CartKey {
        CartKey::Customer(Username::parse("alice").unwrap())
    }

    #[test]
    fn test_storage_keys() {
        assert_eq!(CartKey::Guest.storage_key(), "cart_guest");
        assert_eq!(alice().storage_key(), "cart_alice");
    }

    #[tokio::test]
    async fn test_add_increments_existing_line() {
        let store = MemoryStorage::new();
        let mut cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        assert_eq!(cart.add(product(1, 50)).await.unwrap(), 1);
        assert_eq!(cart.add(product(1, 50)).await.unwrap(), 2);
        assert_eq!(cart.add(product(2, 30)).await.unwrap(), 1);
        assert_eq!(cart.lines().len(), 2);

        let reloaded = CartEngine::load(store, CartKey::Guest).await.unwrap();
        assert_eq!(reloaded.lines(), cart.lines());
    }

    #[tokio::test]
    async fn test_decrease_removes_line_at_one() {
        let mut cart = CartEngine::load(MemoryStorage::new(), CartKey::Guest)
            .await
            .unwrap();
        cart.add(product(1, 10)).await.unwrap();
        cart.add(product(1, 10)).await.unwrap();
        assert_eq!(cart.decrease(ProductId::new(1)).await.unwrap(), Some(1));
        assert_eq!(cart.decrease(ProductId::new(1)).await.unwrap(), None);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_missing_line_is_reported_and_cart_unchanged() {
        let mut cart = CartEngine::load(MemoryStorage::new(), CartKey::Guest)
            .await
            .unwrap();
        cart.add(product(1, 10)).await.unwrap();
        assert!(matches!(
            cart.decrease(ProductId::new(9)).await,
            Err(CartError::LineNotFound(_))
        ));
        assert!(matches!(
            cart.remove(ProductId::new(9)).await,
            Err(CartError::LineNotFound(_))
        ));
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(1));
    }

    #[tokio::test]
    async fn test_remove_deletes_regardless_of_quantity() {
        let mut cart = CartEngine::load(MemoryStorage::new(), CartKey::Guest)
            .await
            .unwrap();
        for _ in 0..3 {
            cart.add(product(4, 10)).await.unwrap();
        }
        let line = cart.remove(ProductId::new(4)).await.unwrap();
        assert_eq!(line.quantity, 3);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_total_and_item_count() {
        let mut cart = CartEngine::load(MemoryStorage::new(), CartKey::Guest)
            .await
            .unwrap();
        cart.add(product(1, 50)).await.unwrap();
        cart.add(product(1, 50)).await.unwrap();
        cart.add(product(2, 30)).await.unwrap();
        assert_eq!(cart.total(), Decimal::from(130));
        assert_eq!(cart.item_count(), 3);
    }

    #[tokio::test]
    async fn test_clear_deletes_durable_record() {
        let store = MemoryStorage::new();
        let mut cart = CartEngine::load(store.clone(), alice()).await.unwrap();
        cart.add(product(1, 5)).await.unwrap();
        assert!(store.contains("cart_alice").await);

        cart.clear().await.unwrap();
        assert!(!store.contains("cart_alice").await);
        let reloaded = CartEngine::load(store, alice()).await.unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_emptying_by_decrease_keeps_an_empty_record() {
        let store = MemoryStorage::new();
        let mut cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        cart.add(product(1, 5)).await.unwrap();
        cart.decrease(ProductId::new(1)).await.unwrap();
        assert_eq!(store.get("cart_guest").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_set_identity_switches_and_is_idempotent() {
        let store = MemoryStorage::new();
        let mut cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        cart.add(product(1, 5)).await.unwrap();

        cart.set_identity(alice()).await.unwrap();
        assert!(cart.is_empty());
        cart.add(product(2, 5)).await.unwrap();
        cart.set_identity(alice()).await.unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(2)), Some(1));

        cart.set_identity(CartKey::Guest).await.unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(1));
        assert_eq!(cart.quantity_of(ProductId::new(2)), None);
    }

    #[tokio::test]
    async fn test_load_drops_zero_quantity_and_tolerates_corruption() {
        let store = MemoryStorage::new();
        let lines = vec![
            CartLine {
                product: product(1, 5),
                quantity: 0,
            },
            CartLine {
                product: product(2, 5),
                quantity: 2,
            },
        ];
        storage::set_json(&store, "cart_guest", &lines).await.unwrap();
        let cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product.id, ProductId::new(2));

        store.set("cart_guest", "garbage".to_owned()).await.unwrap();
        let cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        assert!(cart.is_empty());

        // Saved before prices were bounded.
        let stale = r#"[{"product":{"id":1,"title":"Fig","price":"20000000000000000000000000000"},"quantity":4}]"#;
        store.set("cart_guest", stale.to_owned()).await.unwrap();
        let cart = CartEngine::load(store, CartKey::Guest).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_quantity_never_below_one_over_mixed_sequence() {
        let mut cart = CartEngine::load(MemoryStorage::new(), CartKey::Guest)
            .await
            .unwrap();
        let ops: [(u8, i32); 12] = [
            (0, 1),
            (0, 2),
            (1, 1),
            (0, 1),
            (0, 1),
            (1, 1),
            (2, 2),
            (0, 3),
            (1, 3),
            (1, 1),
            (0, 2),
            (1, 2),
        ];
        // Reference model: product id to quantity.
        let mut model: HashMap<i32, u32> = HashMap::new();
        for (op, raw) in ops {
            let id = ProductId::new(raw);
            let _ = match op {
                0 => {
                    *model.entry(raw).or_default() += 1;
                    cart.add(product(raw, 7)).await.map(|_| ())
                }
                1 => {
                    if let Some(q) = model.get_mut(&raw) {
                        *q -= 1;
                    }
                    model.retain(|_, q| *q > 0);
                    cart.decrease(id).await.map(|_| ())
                }
                _ => {
                    model.remove(&raw);
                    cart.remove(id).await.map(|_| ())
                }
            };
            assert!(cart.lines().iter().all(|l| l.quantity >= 1));
            for (raw, quantity) in &model {
                assert_eq!(cart.quantity_of(ProductId::new(*raw)), Some(*quantity));
            }
            assert_eq!(cart.lines().len(), model.len());
            let units: u32 = model.values().sum();
            assert_eq!(cart.total(), Decimal::from(7 * units));
        }
    }

    #[tokio::test]
    async fn test_overflowing_add_is_rejected_before_saving() {
        let store = MemoryStorage::new();
        let mut cart = CartEngine::load(store.clone(), CartKey::Guest).await.unwrap();
        let huge = ProductSnapshot {
            price: Price::unbounded(Decimal::MAX * Decimal::new(4, 1)),
            ..product(1, 1)
        };
        cart.add(huge.clone()).await.unwrap();
        cart.add(huge.clone()).await.unwrap();
        let before = store.get("cart_guest").await.unwrap();

        assert!(matches!(
            cart.add(huge.clone()).await,
            Err(CartError::TotalOverflow)
        ));
        assert!(matches!(
            cart.add(huge).await,
            Err(CartError::TotalOverflow)
        ));
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(2));
        assert_eq!(store.get("cart_guest").await.unwrap(), before);

        assert_eq!(cart.decrease(ProductId::new(1)).await.unwrap(), Some(1));
    }

    #[test]
    fn test_total_of_reports_overflow() {
        let line = |quantity| CartLine {
            product: ProductSnapshot {
                price: Price::unbounded(Decimal::MAX),
                ..product(1, 1)
            },
            quantity,
        };
        assert_eq!(total_of(&[line(1)]), Some(Decimal::MAX));
        assert_eq!(total_of(&[line(2)]), None);
        assert_eq!(total_of(&[line(1), line(1)]), None);
        assert_eq!(total_of(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_merge_adds_quantities_and_appends_new() {
        let user = vec![
            CartLine {
                product: product(1, 10),
                quantity: 1,
            },
            CartLine {
                product: product(2, 10),
                quantity: 3,
            },
        ];
        let guest = vec![
            CartLine {
                product: product(1, 10),
                quantity: 2,
            },
            CartLine {
                product: product(3, 10),
                quantity: 1,
            },
        ];
        let merged = merge_lines(user, guest);
        let quantities: Vec<(i32, u32)> = merged
            .iter()
            .map(|l| (l.product.id.as_i32(), l.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 3), (2, 3), (3, 1)]);
    }
}
