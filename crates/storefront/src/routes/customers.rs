//! Customer account route handlers: signup, lookup and saved addresses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use fruit_store_core::{AddressId, UserId};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::Visitor;
use crate::models::{AddressInput, PublicUser, SavedAddress, SignupRequest};
use crate::state::AppState;

/// Query of `GET /customers`.
#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub name: Option<String>,
}

/// Body of every address endpoint.
#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<SavedAddress>,
}

/// POST /customers
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let user = state.auth().register(request).await?;
    info!(user_id = %user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

/// GET /customers
///
/// Admins see everyone; anyone else may only probe one exact name.
#[instrument(skip(state, visitor))]
pub async fn search(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<PublicUser>>> {
    let users = state
        .customers()
        .search(&visitor.actor, query.name.as_deref())
        .await?;
    Ok(Json(users))
}

/// GET /customers/{id}/address
#[instrument(skip(state, visitor))]
pub async fn addresses(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<UserId>,
) -> Result<Json<AddressList>> {
    let addresses = state.customers().addresses(&visitor.actor, id).await?;
    Ok(Json(AddressList { addresses }))
}

/// POST /customers/{id}/address
#[instrument(skip(state, visitor, input))]
pub async fn add_address(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<UserId>,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<AddressList>)> {
    let addresses = state
        .customers()
        .add_address(&visitor.actor, id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(AddressList { addresses })))
}

/// DELETE /customers/{id}/address/{addrId}
#[instrument(skip(state, visitor))]
pub async fn remove_address(
    State(state): State<AppState>,
    visitor: Visitor,
    Path((id, address_id)): Path<(UserId, AddressId)>,
) -> Result<Json<AddressList>> {
    let addresses = state
        .customers()
        .remove_address(&visitor.actor, id, address_id)
        .await?;
    Ok(Json(AddressList { addresses }))
}
