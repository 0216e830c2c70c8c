//! Star ratings for products and reviews.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned for a rating outside 1 to 5.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("rating must be between 1 and 5")]
pub struct RatingError;

/// A rating between 1 and 5 inclusive. Fractions are allowed (4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rating(Decimal);

impl Rating {
    /// # Errors
    ///
    /// Returns [`RatingError`] when `value` is outside 1 to 5.
    pub fn new(value: Decimal) -> Result<Self, RatingError> {
        if value < Decimal::ONE || value > Decimal::from(5) {
            return Err(RatingError);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Rating {
    type Error = RatingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for Decimal {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}
