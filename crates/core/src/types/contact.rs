//! Delivery contact fields: contact number, postal code and signup phone.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing contact fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// Contact number is not exactly ten digits.
    #[error("contact number must be exactly 10 digits")]
    InvalidContactNumber,
    /// Pincode is not exactly six digits.
    #[error("pincode must be exactly 6 digits")]
    InvalidPincode,
    /// Phone number is not an optional `+` followed by 7 to 15 digits.
    #[error("phone number must be 7 to 15 digits, optionally prefixed with +")]
    InvalidPhone,
}

fn is_digits(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

macro_rules! digit_string {
    ($(#[$meta:meta])* $name:ident, $check:expr, $err:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse after trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns a [`ContactError`] if the value has the wrong shape.
            pub fn parse(s: &str) -> Result<Self, ContactError> {
                let s = s.trim();
                let check: fn(&str) -> bool = $check;
                if check(s) {
                    Ok(Self(s.to_owned()))
                } else {
                    Err($err)
                }
            }

            /// Returns the value as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ContactError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

digit_string!(
    /// A ten digit delivery contact number.
    ContactNumber,
    |s| is_digits(s, 10, 10),
    ContactError::InvalidContactNumber
);

digit_string!(
    /// A six digit postal code.
    Pincode,
    |s| is_digits(s, 6, 6),
    ContactError::InvalidPincode
);

digit_string!(
    /// A signup phone number: optional leading `+`, then 7 to 15 digits.
    PhoneNumber,
    |s| is_digits(s.strip_prefix('+').unwrap_or(s), 7, 15),
    ContactError::InvalidPhone
);
