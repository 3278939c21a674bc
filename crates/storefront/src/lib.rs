//! Emporium storefront client.
//!
//! Talks to the Emporium commerce backend and keeps the shopper's cart and
//! wishlist on disk. Front ends (the `emporium` CLI, tests) build a
//! [`Storefront`] and drive it.
//!
//! # Modules
//!
//! - [`api`] - HTTP client for the backend REST API, with a response cache
//! - [`store`] - persisted cart and wishlist with change notification
//! - [`coupons`], [`shipping`], [`checkout`] - the checkout flow

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod coupons;
pub mod error;
pub mod shipping;
pub mod state;
pub mod storage;
pub mod store;

pub use state::Storefront;
