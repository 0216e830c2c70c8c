//! Session-related types.

use serde::Serialize;

use fruit_store_core::UserId;
use fruit_store_core::identity::Actor;

/// The current actor as reported by `GET /session`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub actor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_key: Option<String>,
}

impl From<&Actor> for SessionView {
    fn from(actor: &Actor) -> Self {
        let (id, name) = match actor {
            Actor::Customer { id, name } => (Some(*id), Some(name.to_string())),
            Actor::Guest | Actor::Admin => (None, None),
        };
        Self {
            actor: actor.kind(),
            id,
            name,
            cart_key: actor.cart_key().map(|k| k.to_string()),
        }
    }
}
