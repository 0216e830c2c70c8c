//! Domain models for the storefront.
//!
//! Request bodies are deserialized leniently (missing fields default) and
//! then validated into typed drafts, so clients get field-level messages
//! instead of a JSON parse failure.

pub mod order;
pub mod product;
pub mod session;
pub mod user;
pub mod validation;

pub use order::{
    Checkout, CheckoutDraft, CheckoutRequest, DeliveryAddress, DeliveryInfo, ItemAddressInput,
    NewOrder, Order, OrderItem, OrderView, PaymentMethod,
};
pub use product::{Product, ProductDraft, ProductInput, Review, ReviewInput};
pub use session::SessionView;
pub use user::{
    AddressInput, AdminUser, Credential, NewAddress, NewUser, PublicUser, SavedAddress,
    SignupRequest, User,
};
pub use validation::FieldErrors;
