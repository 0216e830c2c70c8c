//! Order lifecycle: placement from the bound cart, listings, and status
//! changes checked against the transition table.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, instrument};

use fruit_store_core::cart::CartEngine;
use fruit_store_core::identity::Actor;
use fruit_store_core::storage::KeyValueStore;
use fruit_store_core::{OrderId, OrderStatus, Price, StatusParseError, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{CheckoutRequest, FieldErrors, NewOrder, Order, OrderItem};

#[derive(Debug, Error)]
pub enum OrderError {
    /// Only a logged-in customer can place or change an order.
    #[error("login required")]
    NotCustomer,

    #[error("cart is empty")]
    EmptyCart,

    /// The cart is bound to a different identity than the actor.
    #[error("cart does not belong to the current customer")]
    CartMismatch,

    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Someone else's order, or a transition the actor may not make.
    #[error("not permitted")]
    Forbidden,

    /// The status changed between read and write.
    #[error("order {0} was updated concurrently")]
    Conflict(OrderId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
}

impl OrderService {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Turn the actor's cart into a pending order, then clear the cart.
    ///
    /// Items and total come from the cart snapshot, never from the request.
    /// Each item ships to its override address or the order address. Once
    /// the order is stored, a failure to clear the cart is logged and the
    /// order is still returned.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCustomer` for guests and admins,
    /// `OrderError::CartMismatch` if `cart` is bound to someone else,
    /// `OrderError::EmptyCart`, or `OrderError::Validation` for a bad form
    /// or a total too large to store.
    #[instrument(skip(self, cart, request), fields(cart = %cart.key()))]
    pub async fn place<S: KeyValueStore>(
        &self,
        actor: &Actor,
        cart: &mut CartEngine<S>,
        request: CheckoutRequest,
    ) -> Result<Order, OrderError> {
        let Actor::Customer { id, name } = actor else {
            return Err(OrderError::NotCustomer);
        };
        if actor.cart_key().as_ref() != Some(cart.key()) {
            return Err(OrderError::CartMismatch);
        }
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let checkout = request.validate()?;
        let total = cart.total();
        if !Price::fits_column(total) {
            return Err(FieldErrors::single("total", "Order total is too large").into());
        }

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product.id,
                title: line.product.title.clone(),
                price: line.product.price,
                quantity: line.quantity,
                image: line.product.image.clone(),
                delivery_address: checkout.address_for(line.product.id),
            })
            .collect();

        let order = self
            .orders
            .create(NewOrder {
                user_id: *id,
                user_name: name.clone(),
                delivery: checkout.delivery,
                items,
                total,
                status: OrderStatus::Pending,
                placed_at: Utc::now(),
            })
            .await?;

        info!(order_id = %order.id, customer = %name, total = %order.total, "Order placed");

        if let Err(e) = cart.clear().await {
            error!(order_id = %order.id, error = %e, "Order placed but cart could not be cleared");
        }

        Ok(order)
    }

    /// A customer's orders, most recent first. Readable by that customer
    /// and admins.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for anyone else.
    pub async fn list_for_user(&self, actor: &Actor, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        match actor {
            Actor::Admin => {}
            Actor::Customer { id, .. } if *id == user_id => {}
            Actor::Customer { .. } => return Err(OrderError::Forbidden),
            Actor::Guest => return Err(OrderError::NotCustomer),
        }
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Every order, most recent first, narrowed by a free-text query.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if orders cannot be read.
    pub async fn list_all(&self, query: Option<&str>) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.list_all().await?;
        Ok(match query {
            Some(q) => orders.into_iter().filter(|o| o.matches(q)).collect(),
            None => orders,
        })
    }

    /// Change an order's status.
    ///
    /// Checks run in order: status value, caller, existence, ownership and
    /// transition table, then a compare-and-set write against the status
    /// that was checked.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus`, `OrderError::NotCustomer`,
    /// `OrderError::NotFound`, `OrderError::Forbidden` or
    /// `OrderError::Conflict`. The stored order is unchanged on every error.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: OrderId,
        status: &str,
    ) -> Result<Order, OrderError> {
        let to: OrderStatus = status.trim().parse()?;
        let role = actor.role().ok_or(OrderError::NotCustomer)?;

        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound(id))?;
        if let Actor::Customer { id: own, .. } = actor
            && *own != order.user_id
        {
            return Err(OrderError::Forbidden);
        }
        if !order.status.can_transition(to, role) {
            return Err(OrderError::Forbidden);
        }

        let updated = self
            .orders
            .update_status(id, order.status, to)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound(id),
                RepositoryError::Conflict(_) => OrderError::Conflict(id),
                other => OrderError::Repository(other),
            })?;

        info!(order_id = %id, from = %order.status, to = %to, actor = actor.kind(), "Order status changed");
        Ok(updated)
    }
}
