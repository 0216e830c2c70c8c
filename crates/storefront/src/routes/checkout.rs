//! In-progress checkout form, kept in the session between page visits.

use tracing::{debug, instrument};

use fruit_store_core::identity::keys;
use fruit_store_core::storage::{self, StorageError};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::Visitor;
use crate::models::CheckoutDraft;

/// GET /checkout/draft
///
/// An absent or unreadable draft reads as an empty form.
#[instrument(skip(visitor))]
pub async fn show(visitor: Visitor) -> Result<Json<CheckoutDraft>> {
    let draft = match storage::get_json(visitor.identity.store(), keys::CHECKOUT_FORM).await {
        Ok(draft) => draft.unwrap_or_default(),
        Err(StorageError::Corrupt { .. }) => {
            debug!("Discarding unreadable checkout draft");
            CheckoutDraft::default()
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(draft))
}

/// PUT /checkout/draft
#[instrument(skip(visitor, draft))]
pub async fn save(visitor: Visitor, Json(draft): Json<CheckoutDraft>) -> Result<Json<CheckoutDraft>> {
    storage::set_json(visitor.identity.store(), keys::CHECKOUT_FORM, &draft).await?;
    Ok(Json(draft))
}
