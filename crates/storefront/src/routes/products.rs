//! Product catalog route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use fruit_store_core::ProductId;
use fruit_store_core::identity::Actor;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::{RequireAdmin, Visitor};
use crate::models::{Product, ProductInput, ReviewInput};
use crate::state::AppState;

/// Query of `GET /products`.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    review: ReviewInput,
}

/// GET /products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list(query.q.as_deref()).await?;
    Ok(Json(products))
}

/// GET /products/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(id).await?))
}

/// POST /products
#[instrument(skip(state, _admin, input))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}
///
/// `{"review": {...}}` appends a review and is open to every visitor. Any
/// other body is a full edit and needs an admin.
#[instrument(skip(state, visitor, body))]
pub async fn update(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<ProductId>,
    Json(body): Json<Value>,
) -> Result<Json<Product>> {
    if body.get("review").is_some() {
        let ReviewBody { review } = serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid review: {e}")))?;
        let product = state.catalog().add_review(id, review).await?;
        add_breadcrumb("catalog", "Review added", Some(&[("product_id", &id.to_string())]));
        return Ok(Json(product));
    }

    if !matches!(visitor.actor, Actor::Admin) {
        return Err(AppError::Forbidden);
    }
    let input: ProductInput = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid product: {e}")))?;
    Ok(Json(state.catalog().update(id, input).await?))
}

/// DELETE /products/{id}
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
