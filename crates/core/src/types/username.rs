//! Customer and admin account names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input is empty after trimming.
    #[error("name cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input collides with the guest identity key.
    #[error("name \"{0}\" is reserved")]
    Reserved(String),
}

/// An account name in canonical (trimmed, lower-case) form.
///
/// Names are compared case-insensitively, so "Vivek" and "vivek" parse to the
/// same value. The canonical form doubles as the cart identity key, which is
/// why `guest` cannot be registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 64;

    /// The identity key reserved for anonymous shoppers.
    pub const GUEST: &'static str = "guest";

    /// Parse and canonicalize a name.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`] characters, or equal to `guest`.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let canonical = s.trim().to_lowercase();
        if canonical.is_empty() {
            return Err(UsernameError::Empty);
        }
        if canonical.chars().count() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if canonical == Self::GUEST {
            return Err(UsernameError::Reserved(canonical));
        }
        Ok(Self(canonical))
    }

    /// Returns the canonical name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring match, used by admin filters.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(&needle.trim().to_lowercase())
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_identity() {
        assert_eq!(
            Username::parse("Vivek").unwrap(),
            Username::parse("vivek").unwrap()
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(Username::parse("  Asha ").unwrap().as_str(), "asha");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Username::parse("   "), Err(UsernameError::Empty));
    }

    #[test]
    fn test_rejects_guest_in_any_case() {
        assert!(matches!(
            Username::parse("GUEST"),
            Err(UsernameError::Reserved(_))
        ));
    }

    #[test]
    fn test_rejects_too_long() {
        let long = "a".repeat(Username::MAX_LENGTH + 1);
        assert!(matches!(
            Username::parse(&long),
            Err(UsernameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_canonicalizes() {
        let name: Username = serde_json::from_str("\"MeeRa\"").unwrap();
        assert_eq!(name.as_str(), "meera");
    }

    #[test]
    fn test_contains() {
        let name = Username::parse("priyanka").unwrap();
        assert!(name.contains("YANK"));
        assert!(!name.contains("raj"));
    }
}
