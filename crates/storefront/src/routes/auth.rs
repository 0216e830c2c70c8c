//! Identity route handlers: session introspection, customer and admin login,
//! logout.
//!
//! Logins rotate the session id once the new identity is stored.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use fruit_store_core::identity::{CustomerAuth, keys};
use fruit_store_core::storage::{KeyValueStore, StorageError};

use super::cart::CartView;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::Visitor;
use crate::models::{PublicUser, SessionView};
use crate::state::AppState;

/// Body of `POST /customers/login` and `POST /admin/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// Response of `POST /logout`.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub session: SessionView,
    pub cart: CartView,
}

/// Response of `GET /customers/login/remembered`.
#[derive(Debug, Serialize)]
pub struct RememberedUser {
    pub name: Option<String>,
}

async fn rotate_session(session: &Session) -> Result<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Storage(StorageError::Backend(e.to_string())))
}

/// GET /session
pub async fn session(visitor: Visitor) -> Json<SessionView> {
    Json(SessionView::from(&visitor.actor))
}

/// POST /customers/login
///
/// Verifies the credentials, then hands the guest cart over to the customer.
#[instrument(skip(state, visitor, request), fields(name = %request.name))]
pub async fn login(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(request): Json<LoginRequest>,
) -> Result<Json<PublicUser>> {
    let user = state.auth().login(&request.name, &request.password).await?;

    let cart = visitor
        .identity
        .login_customer(CustomerAuth {
            id: user.id,
            name: user.name.clone(),
        })
        .await?;

    let store = visitor.identity.store();
    if request.remember {
        store
            .set(keys::REMEMBER_USER, user.name.as_str().to_owned())
            .await?;
    } else {
        store.delete(keys::REMEMBER_USER).await?;
    }

    rotate_session(&visitor.session).await?;
    set_sentry_user(&user.id, user.name.as_str());
    info!(user_id = %user.id, cart_items = cart.item_count(), "Customer logged in");

    Ok(Json(PublicUser::from(user)))
}

/// POST /admin/login
#[instrument(skip(state, visitor, request), fields(name = %request.name))]
pub async fn admin_login(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionView>> {
    let admin = state
        .auth()
        .login_admin(&request.name, &request.password)
        .await?;

    visitor.identity.login_admin().await?;
    rotate_session(&visitor.session).await?;
    set_sentry_user(&admin.id, admin.name.as_str());

    let actor = visitor.identity.current().await?;
    Ok(Json(SessionView::from(&actor)))
}

/// POST /logout
///
/// A customer's cart is copied into the guest slot; the returned cart is
/// that guest cart.
#[instrument(skip(visitor))]
pub async fn logout(visitor: Visitor) -> Result<Json<LogoutResponse>> {
    let cart = visitor.identity.logout().await?;
    clear_sentry_user();

    let actor = visitor.identity.current().await?;

    Ok(Json(LogoutResponse {
        session: SessionView::from(&actor),
        cart: CartView::from(&cart),
    }))
}

/// GET /customers/login/remembered
pub async fn remembered(visitor: Visitor) -> Result<Json<RememberedUser>> {
    let name = visitor.identity.store().get(keys::REMEMBER_USER).await?;
    Ok(Json(RememberedUser { name }))
}
