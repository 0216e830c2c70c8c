//! Validated value types for the fruit store.
//!
//! Each type parses once at the boundary so the rest of the code can rely on
//! its invariant.

pub mod contact;
pub mod email;
pub mod id;
pub mod price;
pub mod rating;
pub mod status;
pub mod username;

pub use contact::{ContactError, ContactNumber, PhoneNumber, Pincode};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError};
pub use status::{ActorRole, OrderStatus, StatusParseError};
pub use username::{Username, UsernameError};
