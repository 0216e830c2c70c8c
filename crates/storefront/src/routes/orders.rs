//! Order route handlers.
//!
//! Orders are placed from the session's bound cart; clients never send
//! line items or totals.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use fruit_store_core::identity::keys;
use fruit_store_core::storage::KeyValueStore;
use fruit_store_core::{OrderId, UserId};

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::{RequireAdmin, Visitor};
use crate::models::{CheckoutRequest, OrderView};
use crate::state::AppState;

/// Query of `GET /orders`.
#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub q: Option<String>,
}

/// Body of `PUT /orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

fn views(orders: Vec<crate::models::Order>) -> Vec<OrderView> {
    orders.into_iter().map(OrderView::from).collect()
}

/// POST /orders
#[instrument(skip(state, visitor, request))]
pub async fn place(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let (actor, mut cart) = visitor.identity.bind_cart().await?;
    let order = state.orders().place(&actor, &mut cart, request).await?;

    if let Err(e) = visitor.identity.store().delete(keys::CHECKOUT_FORM).await {
        warn!(order_id = %order.id, error = %e, "Failed to drop checkout draft");
    }
    add_breadcrumb(
        "order",
        "Order placed",
        Some(&[("order_id", &order.id.to_string())]),
    );

    Ok((StatusCode::CREATED, Json(OrderView::from(order))))
}

/// GET /orders
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.orders().list_all(query.q.as_deref()).await?;
    Ok(Json(views(orders)))
}

/// GET /orders/user/{userId}
#[instrument(skip(state, visitor))]
pub async fn for_user(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.orders().list_for_user(&visitor.actor, user_id).await?;
    Ok(Json(views(orders)))
}

/// PUT /orders/{id}
#[instrument(skip(state, visitor))]
pub async fn update_status(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let order = state
        .orders()
        .update_status(&visitor.actor, id, &update.status)
        .await?;
    Ok(Json(OrderView::from(order)))
}
