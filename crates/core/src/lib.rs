//! Emporium Core - Shared storefront types and checkout arithmetic.
//!
//! This crate provides the domain model used by every Emporium component:
//! - `storefront` - Backend API client, persistent stores and checkout glue
//! - `cli` - Command-line front end for browsing, cart and checkout
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no filesystem access. Everything here can be exercised in plain
//! unit tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, emails and statuses
//! - [`cart`] - Line items and cart list semantics
//! - [`catalog`] - Products, categories, filters and pagination
//! - [`coupon`] - Coupon model and local rule evaluation
//! - [`shipping`] - Shipping methods and tiered quotes
//! - [`totals`] - Order total calculator
//! - [`checkout`] - Checkout form validation and the order payload
//! - [`order`] - Orders, confirmations and payment accounts
//! - [`wishlist`] - Saved-for-later products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod order;
pub mod shipping;
pub mod totals;
pub mod types;
pub mod wishlist;

pub use types::*;
