//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Integer digits a stored amount may carry (`NUMERIC(12, 2)`).
const MAX_INTEGER_DIGITS: u32 = 10;

/// Decimal places a stored amount may carry.
const MAX_SCALE: u32 = 2;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,

    /// More than two decimal places.
    #[error("price can have at most two decimal places")]
    TooPrecise,

    /// Ten or more integer digits.
    #[error("price must be below 10000000000")]
    TooLarge,
}

/// A strictly positive unit price.
///
/// The store trades in a single currency, so only the amount is carried.
/// Arithmetic stays in [`Decimal`] so totals never pick up float drift.
/// Amounts fit the money columns: at most two decimal places and ten
/// integer digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting amounts that are not positive or do not
    /// fit a money column.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] if `amount <= 0`,
    /// [`PriceError::TooPrecise`] for more than two decimal places and
    /// [`PriceError::TooLarge`] for ten or more integer digits.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > MAX_SCALE {
            return Err(PriceError::TooPrecise);
        }
        if !Self::fits_column(amount) {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Whether `amount` has fewer than ten integer digits.
    #[must_use]
    pub fn fits_column(amount: Decimal) -> bool {
        amount.abs() < Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS))
    }

    /// Skip the column limits, to exercise overflow handling.
    #[cfg(test)]
    pub(crate) const fn unbounded(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The amount in the store currency.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, `None` on overflow.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
