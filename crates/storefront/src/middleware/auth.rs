//! Identity extractors.
//!
//! Every request resolves its actor from the session before a handler runs,
//! so a handler never touches a cart that belongs to another identity.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use fruit_store_core::identity::{Actor, IdentityResolver};

use super::session::SessionStorage;
use crate::error::AppError;

/// The session's identity resolver and the actor it resolved.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(visitor: Visitor) -> Result<Json<SessionView>> {
///     Ok(Json(SessionView::from(&visitor.actor)))
/// }
/// ```
pub struct Visitor {
    pub session: Session,
    pub identity: IdentityResolver<SessionStorage>,
    pub actor: Actor,
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let identity = IdentityResolver::new(SessionStorage::new(session.clone()));
        let actor = identity.current().await?;

        Ok(Self {
            session,
            identity,
            actor,
        })
    }
}

/// Extractor that requires the admin role flag.
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Visitor::from_request_parts(parts, state).await?.actor {
            Actor::Admin => Ok(Self),
            Actor::Guest | Actor::Customer { .. } => Err(AppError::Forbidden),
        }
    }
}
