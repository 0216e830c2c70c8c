//! Order status and the transition table that governs it.
//!
//! The lifecycle is a fixed ordered set. Every permission check goes through
//! [`OrderStatus::can_transition`] so route handlers and services never
//! re-implement the rules.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A logged-in customer acting on their own order.
    Customer,
    /// A store administrator.
    Admin,
}

/// Error returned when a status string is not one of the known values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid status value: {0}")]
pub struct StatusParseError(pub String);

/// Order fulfillment status.
///
/// Declaration order is the tracking order; `Cancelled` sits outside the
/// forward path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in tracking order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in [`Self::ALL`], used by order tracking timelines.
    #[must_use]
    pub const fn step(self) -> usize {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    /// Whether `role` may move an order from `self` to `to`.
    ///
    /// | role     | from      | allowed targets |
    /// |----------|-----------|-----------------|
    /// | admin    | any       | any status      |
    /// | customer | pending   | cancelled       |
    /// | customer | otherwise | none            |
    #[must_use]
    pub const fn can_transition(self, to: Self, role: ActorRole) -> bool {
        match role {
            ActorRole::Admin => true,
            ActorRole::Customer => {
                matches!((self, to), (Self::Pending, Self::Cancelled))
            }
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError(s.to_owned()))
    }
}
