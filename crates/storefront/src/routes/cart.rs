//! Cart route handlers.
//!
//! Every handler binds the cart to the session's current identity before
//! touching it. Admins have no cart.

use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fruit_store_core::ProductId;
use fruit_store_core::cart::{CartEngine, CartLine};
use fruit_store_core::storage::KeyValueStore;

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::Visitor;
use crate::state::AppState;

/// A cart as returned over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Identity key the cart is stored under.
    pub key: String,
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    #[serde(flatten)]
    pub line: CartLine,
    pub subtotal: Decimal,
}

impl<S: KeyValueStore> From<&CartEngine<S>> for CartView {
    fn from(cart: &CartEngine<S>) -> Self {
        Self {
            key: cart.key().identity().to_owned(),
            items: cart
                .lines()
                .iter()
                .map(|line| CartItemView {
                    // Every line of a committed cart has a computable subtotal.
                    subtotal: line.subtotal().unwrap_or_default(),
                    line: line.clone(),
                })
                .collect(),
            item_count: cart.item_count(),
            total: cart.total(),
        }
    }
}

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

/// GET /cart
#[instrument(skip(visitor))]
pub async fn show(visitor: Visitor) -> Result<Json<CartView>> {
    let (_, cart) = visitor.identity.bind_cart().await?;
    Ok(Json(CartView::from(&cart)))
}

/// POST /cart/items
///
/// Adds one unit, snapshotting the product as it is in the catalog now.
#[instrument(skip(state, visitor))]
pub async fn add(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let (_, mut cart) = visitor.identity.bind_cart().await?;
    let snapshot = state.catalog().snapshot(request.product_id).await?;
    let quantity = cart.add(snapshot).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", &request.product_id.to_string()),
            ("quantity", &quantity.to_string()),
        ]),
    );
    Ok(Json(CartView::from(&cart)))
}

/// POST /cart/items/{productId}/decrease
#[instrument(skip(visitor))]
pub async fn decrease(visitor: Visitor, Path(product_id): Path<ProductId>) -> Result<Json<CartView>> {
    let (_, mut cart) = visitor.identity.bind_cart().await?;
    cart.decrease(product_id).await?;
    Ok(Json(CartView::from(&cart)))
}

/// DELETE /cart/items/{productId}
#[instrument(skip(visitor))]
pub async fn remove(visitor: Visitor, Path(product_id): Path<ProductId>) -> Result<Json<CartView>> {
    let (_, mut cart) = visitor.identity.bind_cart().await?;
    cart.remove(product_id).await?;
    Ok(Json(CartView::from(&cart)))
}

/// DELETE /cart
#[instrument(skip(visitor))]
pub async fn clear(visitor: Visitor) -> Result<Json<CartView>> {
    let (_, mut cart) = visitor.identity.bind_cart().await?;
    cart.clear().await?;
    Ok(Json(CartView::from(&cart)))
}
