//! Fruit Store Core - domain library.
//!
//! This crate holds everything about the store that does not touch HTTP or a
//! database:
//! - [`types`] - validated values (ids, names, prices, contact fields) and the
//!   order status transition table
//! - [`storage`] - the key-value seam behind durable client state
//! - [`cart`] - the per-identity cart engine
//! - [`identity`] - actor resolution and the login/logout cart hand-off
//!
//! The storefront server plugs a session-backed [`storage::KeyValueStore`]
//! into the cart and identity modules; tests use [`storage::MemoryStorage`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod identity;
pub mod storage;
pub mod types;

pub use types::*;
